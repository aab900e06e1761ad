use std::net::IpAddr;
use std::sync::Arc;

/// The immutable per-query evaluation context (§4.5 Context bindings).
/// Built once per query and shared (by reference) across every rule
/// evaluated against it.
#[derive(Debug, Clone)]
pub struct Context {
    pub domain: Arc<str>,
    pub client_ip: IpAddr,
    pub query_type: &'static str,
    pub hour: i64,
    pub minute: i64,
    pub day: i64,
    pub month: i64,
    /// Sunday = 0, per spec.
    pub weekday: i64,
}

impl Context {
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "Domain" => FieldValue::Str(&self.domain),
            "ClientIP" => FieldValue::ClientIp(self.client_ip),
            "QueryType" => FieldValue::Str(self.query_type),
            "Hour" => FieldValue::Int(self.hour),
            "Minute" => FieldValue::Int(self.minute),
            "Day" => FieldValue::Int(self.day),
            "Month" => FieldValue::Int(self.month),
            "Weekday" => FieldValue::Int(self.weekday),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Str(&'a str),
    ClientIp(IpAddr),
    Int(i64),
}

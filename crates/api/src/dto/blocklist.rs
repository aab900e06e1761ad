use serde::Serialize;

#[derive(Serialize, Debug, Clone)]
pub struct BlocklistReloadResponse {
    pub success: bool,
    pub size: usize,
    pub error: Option<String>,
}

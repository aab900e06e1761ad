mod reload;

pub use reload::ReloadBlocklistUseCase;

pub type Symbol = String;
pub type ModelId = String;
pub type TgUserId = i64;

pub mod amount;
pub mod currency;
pub mod transfer;

pub use currency::{BaseUnit, CurrencyConfig};
pub use transfer::{NormalizedTransfer, PreparedTransaction, UnsignedTransaction};

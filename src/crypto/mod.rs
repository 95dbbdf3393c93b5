//! Protection of sensitive account data at rest
//!
//! Sensitive values (bank account numbers) are encrypted with a single
//! process-wide 256-bit key loaded at startup. After the initial write a
//! client only ever sees the masked view.

pub mod bank;
pub mod field;

pub use bank::{BankDetailsInput, BankDetailsStatus, BankDetailsView, SealedBankDetails};
pub use field::{mask, EncryptedField, FieldCipher, FieldKey, IV_LEN, KEY_HEX_LEN, MASK_PREFIX};

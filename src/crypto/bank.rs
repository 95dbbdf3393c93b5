//! Artisan bank details
//!
//! The account number is the only field stored encrypted. Reads return a
//! view with the number masked; the full number never leaves this module
//! after the write that stored it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::{EncryptedField, FieldCipher};
use crate::types::{AuthError, Result};

/// Bank details as submitted by the artisan
#[derive(Clone, Deserialize)]
pub struct BankDetailsInput {
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub account_holder_name: String,
    pub pan_card_number: String,
}

impl fmt::Debug for BankDetailsInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankDetailsInput")
            .field("bank_name", &self.bank_name)
            .field("account_number", &"<redacted>")
            .field("ifsc_code", &self.ifsc_code)
            .field("account_holder_name", &self.account_holder_name)
            .field("pan_card_number", &"<redacted>")
            .finish()
    }
}

/// Bank details as stored. Columns are nullable until the artisan registers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SealedBankDetails {
    pub bank_account_name: Option<String>,
    pub bank_account_number_encrypted: Option<EncryptedField>,
    pub bank_ifsc_code: Option<String>,
    pub bank_account_holder_name: Option<String>,
    pub pan_card_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BankDetailsStatus {
    Registered,
    NotRegistered,
}

/// What a client is shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankDetailsView {
    pub bank_account_name: Option<String>,
    pub bank_account_number_masked: Option<String>,
    pub bank_ifsc_code: Option<String>,
    pub bank_details_status: BankDetailsStatus,
}

impl FieldCipher {
    /// Validate and encrypt bank details for storage.
    ///
    /// Every call re-encrypts the account number under a fresh IV.
    pub fn seal_bank_details(&self, input: &BankDetailsInput) -> Result<SealedBankDetails> {
        let fields = [
            &input.bank_name,
            &input.account_number,
            &input.ifsc_code,
            &input.account_holder_name,
            &input.pan_card_number,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AuthError::BadRequest(
                "All bank details fields are required.".into(),
            ));
        }

        Ok(SealedBankDetails {
            bank_account_name: Some(input.bank_name.trim().to_string()),
            bank_account_number_encrypted: Some(self.encrypt(input.account_number.trim())?),
            bank_ifsc_code: Some(input.ifsc_code.trim().to_string()),
            bank_account_holder_name: Some(input.account_holder_name.trim().to_string()),
            pan_card_number: Some(input.pan_card_number.trim().to_string()),
        })
    }

    /// Build the client view, masking the account number
    pub fn bank_details_view(&self, sealed: &SealedBankDetails) -> Result<BankDetailsView> {
        let masked = match &sealed.bank_account_number_encrypted {
            Some(stored) => Some(self.reveal_masked(stored)?),
            None => None,
        };

        let status = if sealed.bank_account_name.is_some() && sealed.bank_ifsc_code.is_some() {
            BankDetailsStatus::Registered
        } else {
            BankDetailsStatus::NotRegistered
        };

        Ok(BankDetailsView {
            bank_account_name: sealed.bank_account_name.clone(),
            bank_account_number_masked: masked,
            bank_ifsc_code: sealed.bank_ifsc_code.clone(),
            bank_details_status: status,
        })
    }
}

//! The artifacts a mint persists.
//!
//! These are plain values: they don't know how they are stored. Wire names follow the Cashu
//! NUTs so they can be handed as-is to whatever API layer sits in front of the mint.

use serde::{Deserialize, Serialize};

/// A spendable piece of ecash, identified by its secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Keyset id
    #[serde(default)]
    pub id: String,
    pub amount: u64,
    pub secret: String,
    /// Unblinded signature
    #[serde(rename = "C")]
    pub c: String,
    /// Earmarked for an in-flight send
    #[serde(default)]
    pub reserved: bool,
    /// Correlates a reservation to a specific outgoing transfer
    #[serde(default)]
    pub send_id: String,
}

/// Audit record of a redeemed proof. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofsUsed {
    #[serde(default)]
    pub id: String,
    pub amount: u64,
    pub secret: String,
    #[serde(rename = "C")]
    pub c: String,
}

impl From<&Proof> for ProofsUsed {
    fn from(proof: &Proof) -> Self {
        ProofsUsed {
            id: proof.id.clone(),
            amount: proof.amount,
            secret: proof.secret.clone(),
            c: proof.c.clone(),
        }
    }
}

/// A blind signature issued by the mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise {
    pub amount: u64,
    /// The blinded message we signed
    #[serde(rename = "B_")]
    pub b_b: String,
    /// Our blind signature on it
    #[serde(rename = "C_")]
    pub c_b: String,
}

/// A P2SH redemption lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2SHScript {
    pub script: String,
    pub signature: String,
    pub address: String,
}

/// A Lightning payment request tracked by the mint.
///
/// `paid` and `issued` only ever go from `false` to `true`, and `issued` must not be set before
/// `paid`. The mint logic is responsible for both: the storage persists what it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub amount: u64,
    /// The bolt11 payment request
    pub pr: String,
    pub hash: String,
    #[serde(default)]
    pub paid: bool,
    /// Whether ecash was minted against this payment
    #[serde(default)]
    pub issued: bool,
    /// Unix timestamp of the invoice creation
    #[serde(default)]
    pub time_created: i64,
    /// Unix timestamp of the payment, `None` while the invoice is not paid
    #[serde(default)]
    pub time_paid: Option<i64>,
}

impl Invoice {
    /// A fresh unpaid invoice, created now.
    pub fn new(amount: u64, pr: String, hash: String) -> Invoice {
        Invoice {
            amount,
            pr,
            hash,
            paid: false,
            issued: false,
            time_created: chrono::Utc::now().timestamp(),
            time_paid: None,
        }
    }
}

/// A single mutation of a stored invoice. A list of them is applied in order to the fetched
/// invoice before it is saved back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceUpdate {
    SetPaid(bool),
    SetIssued(bool),
    SetTimePaid(i64),
}

impl InvoiceUpdate {
    pub fn apply(&self, invoice: &mut Invoice) {
        match *self {
            Self::SetPaid(paid) => invoice.paid = paid,
            Self::SetIssued(issued) => invoice.issued = issued,
            Self::SetTimePaid(time) => invoice.time_paid = Some(time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let proof: Proof = serde_json::from_str(
            r#"{"id":"I2yN+iRYfkzT","amount":8,"secret":"407915bc212be61a77e3e6d2aeb4c727","C":"02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"}"#,
        )
        .unwrap();
        assert_eq!(proof.amount, 8);
        assert!(!proof.reserved);
        assert!(proof.send_id.is_empty());
        assert_eq!(
            proof.c,
            "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
        );

        let promise = Promise {
            amount: 2,
            b_b: "blinded".to_string(),
            c_b: "signed".to_string(),
        };
        let json = serde_json::to_value(&promise).unwrap();
        assert_eq!(json["B_"], "blinded");
        assert_eq!(json["C_"], "signed");
    }

    #[test]
    fn invoice_updates_apply_in_order() {
        let mut invoice = Invoice::new(21, "lnbc210n1...".to_string(), "h".to_string());
        assert!(invoice.time_created > 0);
        assert_eq!(invoice.time_paid, None);

        for update in &[
            InvoiceUpdate::SetPaid(true),
            InvoiceUpdate::SetIssued(true),
            InvoiceUpdate::SetIssued(false),
            InvoiceUpdate::SetTimePaid(1_700_000_000),
        ] {
            update.apply(&mut invoice);
        }
        assert!(invoice.paid);
        assert!(!invoice.issued);
        assert_eq!(invoice.time_paid, Some(1_700_000_000));
    }

    #[test]
    fn used_proof_from_proof() {
        let proof = Proof {
            id: "keyset".to_string(),
            amount: 4,
            secret: "abc".to_string(),
            c: "02aa".to_string(),
            reserved: true,
            send_id: "tx1".to_string(),
        };
        let used = ProofsUsed::from(&proof);
        assert_eq!(used.secret, "abc");
        assert_eq!(used.amount, 4);
        assert_eq!(used.c, "02aa");
        assert_eq!(used.id, "keyset");
    }
}

use rand::RngCore;

pub const TRANSACTION_ID_LEN: usize = 4;

/// Short opaque value generated for each outbound query and echoed in the
/// peer's response. This system does not persist per-transaction state; the
/// generator below is the only piece of "token manager" state this crate
/// keeps.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TransactionId([u8; TRANSACTION_ID_LEN]);

impl TransactionId {
    pub fn generate() -> TransactionId {
        let mut bytes = [0u8; TRANSACTION_ID_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        TransactionId(bytes)
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<TransactionId> for Vec<u8> {
    fn from(id: TransactionId) -> Vec<u8> {
        id.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_four_byte_ids() {
        let id = TransactionId::generate();
        assert_eq!(id.to_vec().len(), TRANSACTION_ID_LEN);
    }
}

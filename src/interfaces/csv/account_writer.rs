use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes accounts as CSV with an `id,name,contact,balance` header.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> Result<()> {
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountId, Balance};

    #[test]
    fn test_write_accounts() {
        let mut out = Vec::new();
        {
            let mut writer = AccountWriter::new(&mut out);
            writer
                .write_accounts(vec![
                    Account {
                        id: AccountId(1),
                        name: "Alice".to_string(),
                        contact: "alice@example.com".to_string(),
                        balance: Balance(300),
                    },
                    Account {
                        id: AccountId(2),
                        name: "Bob".to_string(),
                        contact: "bob@example.com".to_string(),
                        balance: Balance(0),
                    },
                ])
                .unwrap();
        }
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,name,contact,balance\n1,Alice,alice@example.com,300\n2,Bob,bob@example.com,0\n"
        );
    }
}

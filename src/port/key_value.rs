use super::PortFuture;

/// Reply to a key-value command, reduced to the shapes Kaho reads.
#[derive(Debug, Clone, PartialEq)]
pub enum KvReply {
    Nil,
    Ok,
    Int(i64),
    Text(String),
    Array(Vec<KvReply>),
}

impl KvReply {
    pub fn into_texts(self) -> Option<Vec<String>> {
        match self {
            KvReply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    KvReply::Text(text) => Some(text),
                    _ => None,
                })
                .collect(),
            KvReply::Nil => Some(Vec::new()),
            _ => None,
        }
    }
}

pub trait KeyValuePool: Send + Sync {
    /// Issue a single command (`LPUSH`, `LTRIM`, `PUBLISH`, ...) on a pooled connection.
    fn command<'a>(&'a self, name: &'a str, args: Vec<String>) -> PortFuture<'a, KvReply>;
}

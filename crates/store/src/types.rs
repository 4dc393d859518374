/// Opaque lease handle; the concrete value is the store's lease id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(pub i64);

#[derive(Debug, Clone)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl KvEntry {
    pub fn value_str(&self) -> Result<String, crate::Error> {
        String::from_utf8(self.value.clone()).map_err(|source| crate::Error::Malformed {
            key: self.key.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Put,
    Delete,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: WatchKind,
    pub key: String,
    pub value: Vec<u8>,
}

impl WatchEvent {
    pub fn value_str(&self) -> Result<String, crate::Error> {
        String::from_utf8(self.value.clone()).map_err(|source| crate::Error::Malformed {
            key: self.key.clone(),
            source,
        })
    }
}

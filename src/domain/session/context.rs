//! Explicit per-request state for key operations

/// Whether a key write creates a new session or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWriteMode {
    Create,
    Update,
}

/// Everything a key operation needs to know about the admin request that
/// triggered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequestContext {
    pub org_id: String,
    pub api_id: String,
    /// The key name supplied is already the storage hash
    pub hashed: bool,
    /// Keep the current quota window and rate limiter marker on update
    pub suppress_reset: bool,
    pub mode: KeyWriteMode,
}

impl KeyRequestContext {
    pub fn create() -> Self {
        Self {
            org_id: String::new(),
            api_id: String::new(),
            hashed: false,
            suppress_reset: false,
            mode: KeyWriteMode::Create,
        }
    }

    pub fn update() -> Self {
        Self {
            mode: KeyWriteMode::Update,
            ..Self::create()
        }
    }

    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = org_id.into();
        self
    }

    pub fn with_api(mut self, api_id: impl Into<String>) -> Self {
        self.api_id = api_id.into();
        self
    }

    pub fn hashed(mut self, hashed: bool) -> Self {
        self.hashed = hashed;
        self
    }

    pub fn suppress_reset(mut self, suppress: bool) -> Self {
        self.suppress_reset = suppress;
        self
    }

    pub fn is_update(&self) -> bool {
        self.mode == KeyWriteMode::Update
    }
}

/// What a key write did, as reported back to the admin caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Added,
    Modified,
    Updated,
    Deleted,
}

impl KeyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for KeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a key write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: String,
    pub action: KeyAction,
    pub key_hash: Option<String>,
}

impl KeyChange {
    pub fn new(key: impl Into<String>, action: KeyAction) -> Self {
        Self {
            key: key.into(),
            action,
            key_hash: None,
        }
    }

    pub fn with_hash(mut self, key_hash: impl Into<String>) -> Self {
        self.key_hash = Some(key_hash.into());
        self
    }
}

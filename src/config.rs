/// Storage backend a run targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// General purpose (optionally versioned) buckets.
    Object,
    /// Directory buckets (S3 Express One Zone).
    DirectoryObject,
    /// Table buckets (S3 Tables).
    Table,
    /// Vector buckets (S3 Vectors).
    Vector,
}

impl Backend {
    /// Noun used in progress and summary messages.
    pub fn item_noun(self) -> &'static str {
        match self {
            Backend::Object | Backend::DirectoryObject => "objects",
            Backend::Table => "tables",
            Backend::Vector => "indexes",
        }
    }
}

/// Bucket-level parallelism requested on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concurrency {
    Sequential,
    /// `-c` without `-n`: one slot per target.
    PerTarget,
    Limited(usize),
}

impl Concurrency {
    /// Semaphore width for `targets` buckets.
    pub fn effective(self, targets: usize) -> usize {
        match self {
            Concurrency::Sequential => 1,
            Concurrency::PerTarget => targets.max(1),
            Concurrency::Limited(n) => n.max(1),
        }
    }
}

/// Options every wrapper reads while clearing. Immutable for the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClearOptions {
    pub force: bool,
    pub old_versions_only: bool,
    pub quiet: bool,
    pub key_prefix: Option<String>,
}

/// Settings used to build the SDK clients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Validated options of a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub backend: Backend,
    pub bucket_names: Vec<String>,
    pub interactive: bool,
    pub concurrency: Concurrency,
    pub clear: ClearOptions,
    pub connection: ConnectionOptions,
}

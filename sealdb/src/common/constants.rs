/// Field holding a document's unique identifier.
pub const DOC_ID: &str = "$id";
/// Field naming the target collection of a reference.
pub const DOC_REF: &str = "$ref";

pub const FIELD_SEPARATOR: char = '.';
pub const INDEX_NAME_SEPARATOR: &str = "_";

// query operators
pub const OP_OR: &str = "$or";
pub const OP_EQ: &str = "$eq";
pub const OP_NE: &str = "$ne";
pub const OP_EXISTS: &str = "$exists";
pub const OP_SIZE: &str = "$size";
pub const OP_WITHIN: &str = "$within";
pub const OP_GT: &str = "$gt";
pub const OP_GTE: &str = "$gte";
pub const OP_LT: &str = "$lt";
pub const OP_LTE: &str = "$lte";
pub const OP_IN: &str = "$in";
pub const OP_NIN: &str = "$nin";
pub const OP_REGEX: &str = "$regex";
pub const OP_OPTIONS: &str = "$options";

// mutation operators
pub const OP_SET: &str = "$set";
pub const OP_UNSET: &str = "$unset";
pub const OP_INC: &str = "$inc";

// result conditions
pub const OPT_SORT: &str = "$sort";
pub const OPT_LIMIT: &str = "$limit";

/// Name of the internal deletion log collection.
pub const RESERVED_LOG_COLLECTION: &str = "__log";
pub const DEFAULT_LOG_SECRET: &str = "sealdb-deletion-log";
pub const DEFAULT_STORAGE_DIR: &str = "./sealdb-data";
pub const DEFAULT_SECRET: &str = "sealdb";
pub const STORAGE_FILE_EXTENSION: &str = "json";
pub const STATE_FORMAT_VERSION: &str = "1.0";

pub const DEFAULT_SYNC_HOST: &str = "api.mongolab.com";
pub const SYNC_API_PATH: &str = "/api/1";

pub const SEAL_EVENT: &str = "SealEvent";

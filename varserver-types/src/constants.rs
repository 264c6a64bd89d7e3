//! Size limits and defaults shared between the broker core and client channels.

/// Maximum length, in bytes, of a variable's fully qualified name, including
/// an `[instance]/` prefix if present.
pub const MAX_NAME_LEN: usize = 128;

/// Maximum length, in bytes, of a raw tagspec string passed to [`crate::tags::TagSet::parse`].
pub const MAX_TAGSPEC_LEN: usize = 64;

/// Maximum number of distinct tags a single variable may carry.
pub const MAX_TAGS: usize = 8;

/// Maximum length, in bytes, of a printf-style format specifier string.
pub const MAX_FORMAT_LEN: usize = 32;

/// Maximum number of UIDs in a single read or write permission list.
pub const MAX_CREDENTIALS: usize = 16;

/// Default size, in bytes, of a client's shared work buffer.
pub const DEFAULT_WORK_BUFFER_LEN: usize = 4096;

/// Upper bound a client may request for its work buffer at registration time.
pub const MAX_WORK_BUFFER_LEN: usize = 64 * 1024;

/// Default capacity, in records, of a client's MODIFIED_QUEUE notification queue.
pub const DEFAULT_NOTIFY_QUEUE_LEN: usize = 64;

/// Default maximum payload size, in bytes, of a single queued notification record.
pub const DEFAULT_NOTIFY_RECORD_LEN: usize = 1024;

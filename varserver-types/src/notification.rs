//! MODIFIED_QUEUE record shape (components F, §6.4/§6.5).

use crate::ids::Handle;
use crate::value::{Value, ValueType};

/// One entry in a client's MODIFIED_QUEUE. Scalars carry their value inline;
/// a string or blob that would exceed the queue element's capacity is
/// dropped entirely rather than partially delivered — `payload` becomes
/// `Value::Invalid` (size zero) and `full_len` still records the true size
/// so the client can tell a drop apart from a genuinely empty value.
#[derive(Debug, Clone)]
pub struct NotifyQueueRecord {
    pub handle: Handle,
    pub value_type: ValueType,
    pub full_len: usize,
    pub payload: Value,
}

impl NotifyQueueRecord {
    pub fn new(handle: Handle, value: &Value, record_cap: usize) -> Self {
        let full_len = value.byte_len();
        let payload = if full_len > record_cap { Value::Invalid } else { value.clone() };
        NotifyQueueRecord {
            handle,
            value_type: value.value_type(),
            full_len,
            payload,
        }
    }

    /// True if this record's payload was dropped for exceeding the queue
    /// element's capacity (as opposed to the value genuinely being empty).
    pub fn dropped(&self) -> bool {
        self.full_len > 0 && matches!(self.payload, Value::Invalid)
    }
}

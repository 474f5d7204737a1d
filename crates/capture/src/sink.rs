use crate::record::Record;
use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of emitted records: one per explicit full capture, one per
/// non-empty flush, one per late frame attach.
pub trait RecordSink {
    fn emit(&mut self, record: Record);
}

impl<F> RecordSink for F
where
    F: FnMut(Record),
{
    fn emit(&mut self, record: Record) {
        self(record)
    }
}

/// Sink that buffers into a shared Vec. Clones share the same buffer, so a
/// test can hand one clone to a session and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct VecRecordSink(Rc<RefCell<Vec<Record>>>);

impl VecRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl RecordSink for VecRecordSink {
    fn emit(&mut self, record: Record) {
        self.0.borrow_mut().push(record);
    }
}

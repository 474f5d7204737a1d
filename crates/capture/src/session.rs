use crate::config::CaptureConfig;
use crate::counters::Counters;
use crate::mirror::Mirror;
use crate::mutation_buffer::MutationBuffer;
use crate::record::{AddedNode, IncrementalRecord, Record};
use crate::serializer::CaptureContext;
use crate::sink::RecordSink;
use dom::{Dom, MutationRecord, NodeRef};
use std::time::Instant;

/// One recorder over one top-level document and its nested frames.
///
/// Sessions share nothing: several may record different [`Dom`]s side by
/// side, each with its own id space.
pub struct CaptureSession {
    ctx: CaptureContext,
    buffer: MutationBuffer,
    sink: Option<Box<dyn RecordSink>>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            ctx: CaptureContext::new(config),
            buffer: MutationBuffer::new(),
            sink: None,
        }
    }

    /// Install the sink every record is emitted to. Records produced before a
    /// sink is installed are dropped.
    pub fn init(&mut self, sink: impl RecordSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn freeze(&mut self) {
        self.buffer.freeze();
    }

    pub fn unfreeze(&mut self) {
        self.buffer.unfreeze();
    }

    pub fn is_frozen(&self) -> bool {
        self.buffer.is_frozen()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.ctx.config
    }

    pub fn mirror(&self) -> &Mirror {
        &self.ctx.mirror
    }

    pub fn counters(&self) -> &Counters {
        &self.ctx.counters
    }

    /// Serialize the whole document and emit it as a full snapshot.
    ///
    /// The buffer is frozen for the duration so pending removals cannot touch
    /// the mirror mid-capture; a buffer that was already frozen stays frozen.
    pub fn take_full_snapshot(&mut self, dom: &Dom) {
        let was_frozen = self.buffer.is_frozen();
        self.buffer.freeze();
        let snapshot = self.ctx.serializer(dom).capture_full();
        if !was_frozen {
            self.buffer.unfreeze();
        }
        match snapshot {
            Some(snapshot) => {
                log::debug!(target: "capture.serializer", "full snapshot, {} nodes tracked", self.ctx.mirror.len());
                self.emit(Record::Full(snapshot));
            }
            None => log::warn!(target: "capture.serializer", "document root is excluded from capture"),
        }
    }

    /// Feed one notification batch; emits at most one incremental record.
    pub fn process_mutations(&mut self, dom: &Dom, records: &[MutationRecord]) {
        if let Some(record) = self.buffer.process_mutations(dom, &mut self.ctx, records) {
            self.emit(Record::Incremental(record));
        }
    }

    /// Drain the host's queued notifications and process them as one batch.
    pub fn observe(&mut self, dom: &mut Dom) {
        let records = dom.take_records();
        self.process_mutations(dom, &records);
    }

    /// Flush whatever is buffered, frozen or not.
    pub fn flush(&mut self, dom: &Dom) {
        if let Some(record) = self.buffer.flush(dom, &mut self.ctx) {
            self.emit(Record::Incremental(record));
        }
    }

    /// The host finished loading the content document of `iframe`.
    pub fn frame_loaded(&mut self, dom: &Dom, iframe: NodeRef) {
        if self.ctx.frames.take(iframe) {
            self.attach_frame(dom, iframe);
        }
    }

    /// Give up waiting on frames whose deadline has passed and attach
    /// whatever content they have.
    pub fn poll_frames(&mut self, dom: &Dom, now: Instant) {
        for iframe in self.ctx.frames.take_expired(now) {
            log::debug!(target: "capture.frames", "frame {iframe:?} timed out");
            self.ctx.counters.frame_timeouts += 1;
            self.attach_frame(dom, iframe);
        }
    }

    /// Frames still waiting for their content.
    pub fn pending_frames(&self) -> usize {
        self.ctx.frames.len()
    }

    fn attach_frame(&mut self, dom: &Dom, iframe: NodeRef) {
        let Some(parent_id) = self.ctx.mirror.id_of(iframe) else {
            log::debug!(target: "capture.frames", "frame {iframe:?} is gone, dropping its content");
            return;
        };
        let Some(doc) = dom.frame_document(iframe) else {
            return;
        };
        let Some(node) = self.ctx.serializer(dom).capture_tree(doc) else {
            return;
        };
        let record = IncrementalRecord {
            adds: vec![AddedNode {
                parent_id,
                next_id: None,
                node,
            }],
            ..IncrementalRecord::default()
        };
        self.emit(Record::Incremental(record));
    }

    fn emit(&mut self, record: Record) {
        let Some(sink) = self.sink.as_mut() else {
            log::trace!(target: "capture.mutation", "no sink installed, dropping record");
            return;
        };
        self.ctx.counters.records_emitted += 1;
        sink.emit(record);
    }
}

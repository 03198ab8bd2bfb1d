use std::collections::BTreeMap;
use core::mem;

use super::Writer;

/// Reorders byte ranges of a stream into its writing end.
///
/// Fragments are identified by the absolute stream index of their first byte. Anything that can
/// be written right away is pushed into the output stream, the rest is kept until the gap before
/// it is filled. Only bytes that would fit into the output's available capacity are ever kept,
/// and fragments never overlap once an insertion has completed.
#[derive(Clone, Debug, Default)]
pub struct Reassembler {
    /// Pending fragments by their starting index, all at or after the output's write cursor.
    pending: BTreeMap<u64, Vec<u8>>,
    bytes_pending: u64,
    /// The index one past the last byte of the stream, once known.
    stream_end: Option<u64>,
}

impl Reassembler {
    /// Create a reassembler without any pending data.
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Insert a fragment starting at `first_index`.
    ///
    /// The fragment marked as the last substring fixes the end of the stream, the output is
    /// closed as soon as everything up to that end has been written. A later fragment claiming a
    /// different end is ignored for that purpose. A fragment reaching past the largest index is
    /// dropped whole.
    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last_substring: bool, output: &mut Writer) {
        if output.is_closed() {
            return;
        }

        let end = match first_index.checked_add(data.len() as u64) {
            Some(end) => end,
            None => {
                net_debug!("dropping fragment at {} past the end of the index space", first_index);
                return;
            },
        };

        if is_last_substring {
            match self.stream_end {
                None => self.stream_end = Some(end),
                Some(known) if known != end => {
                    net_debug!("ignoring conflicting stream end {}, fixed at {}", end, known);
                },
                Some(_) => {},
            }
        }

        if let Some((start, data)) = self.clamp(first_index, end, data, output) {
            self.store(start, data);
            self.merge();
            self.flush(output);
        }

        if self.stream_end == Some(output.bytes_pushed()) {
            output.close();
            self.pending.clear();
            self.bytes_pending = 0;
        }
    }

    /// The number of bytes stored but not yet written.
    pub fn bytes_pending(&self) -> u64 {
        self.bytes_pending
    }

    /// Cut a fragment to the part that is neither delivered, past the end, nor past the window.
    fn clamp<'a>(&self, first_index: u64, end: u64, data: &'a [u8], output: &Writer)
        -> Option<(u64, &'a [u8])>
    {
        let cursor = output.bytes_pushed();
        if end <= cursor {
            return None;
        }

        let (mut start, mut data) = (first_index, data);
        if start < cursor {
            data = &data[(cursor - start) as usize..];
            start = cursor;
        }

        let limit = cursor.saturating_add(output.available_capacity() as u64);
        let limit = match self.stream_end {
            Some(stream_end) => limit.min(stream_end),
            None => limit,
        };

        if start >= limit {
            return None;
        }

        let len = data.len().min((limit - start) as usize);
        Some((start, &data[..len]))
    }

    fn store(&mut self, start: u64, data: &[u8]) {
        match self.pending.get_mut(&start) {
            Some(existing) if existing.len() >= data.len() => {},
            Some(existing) => {
                self.bytes_pending += (data.len() - existing.len()) as u64;
                *existing = data.to_vec();
            },
            None => {
                self.bytes_pending += data.len() as u64;
                self.pending.insert(start, data.to_vec());
            },
        }
    }

    /// Union all fragments that overlap or touch.
    fn merge(&mut self) {
        let mut merged = BTreeMap::new();
        let mut current: Option<(u64, Vec<u8>)> = None;

        for (start, fragment) in mem::take(&mut self.pending) {
            current = match current.take() {
                Some((cur_start, mut cur)) => {
                    let cur_end = cur_start + cur.len() as u64;
                    if start <= cur_end {
                        let end = start + fragment.len() as u64;
                        if end > cur_end {
                            cur.extend_from_slice(&fragment[(cur_end - start) as usize..]);
                        }
                        Some((cur_start, cur))
                    } else {
                        merged.insert(cur_start, cur);
                        Some((start, fragment))
                    }
                },
                None => Some((start, fragment)),
            };
        }

        if let Some((start, fragment)) = current {
            merged.insert(start, fragment);
        }

        self.bytes_pending = merged.values().map(|fragment| fragment.len() as u64).sum();
        self.pending = merged;
    }

    /// Write the fragment at the output's cursor, if there is one.
    fn flush(&mut self, output: &mut Writer) {
        let cursor = output.bytes_pushed();
        let fragment = match self.pending.remove(&cursor) {
            Some(fragment) => fragment,
            None => return,
        };

        let written = output.push(&fragment);
        self.bytes_pending -= written as u64;
        if written < fragment.len() {
            self.pending.insert(cursor + written as u64, fragment[written..].to_vec());
        }
    }
}

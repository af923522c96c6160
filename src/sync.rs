/// In process timeline which retires signals without a gpu, used for tests and headless runs.
pub mod soft;

use crate::Error;

/// A gpu fence seen from the cpu: a counter the gpu queue advances as it completes work.
pub trait Timeline {
    /// Enqueue a signal of `value` on the gpu queue, after all previously submitted work.
    fn signal(&mut self, value: u64) -> Result<(), Error>;
    /// The last value the gpu has reached.
    fn completed_value(&self) -> u64;
    /// Blocks the calling thread until `completed_value() >= value`.
    fn wait(&self, value: u64) -> Result<(), Error>;
}

/// Tracks one fence value per buffered frame so the cpu never records into a back buffer
/// or command allocator which the gpu is still consuming.
///
/// The protocol, for frame `i` currently being recorded:
/// - at the end of the frame signal `fence_values[i]` on the queue
/// - move to the next back buffer `n`
/// - if the gpu has not reached `fence_values[n]` yet, wait for it
/// - `fence_values[n]` becomes the signalled value + 1, the value the next signal for `n` will use
///
/// Every signalled value is larger than the one before, so a single fence serves all frames.
pub struct FrameSync<T: Timeline> {
    timeline: T,
    fence_values: Vec<u64>,
    frame_index: usize,
}

impl<T> FrameSync<T> where T: Timeline {
    /// Create frame sync for `num_buffers` buffered frames, starting on `frame_index`.
    /// All fence values start at 0 and the current frame's is bumped to 1.
    pub fn new(timeline: T, num_buffers: usize, frame_index: usize) -> Result<Self, Error> {
        if num_buffers == 0 {
            return Err(Error {
                msg: "dx12_samples::sync:: frame sync requires at least 1 buffer".to_string()
            });
        }
        if frame_index >= num_buffers {
            return Err(Error {
                msg: format!(
                    "dx12_samples::sync:: initial frame index {} out of range for {} buffers",
                    frame_index, num_buffers)
            });
        }
        let mut fence_values = vec![0; num_buffers];
        fence_values[frame_index] += 1;
        Ok(FrameSync {
            timeline,
            fence_values,
            frame_index,
        })
    }

    /// Waits until the gpu has finished all submitted work, used after init uploads and on quit.
    pub fn wait_for_gpu(&mut self) -> Result<(), Error> {
        let value = self.fence_values[self.frame_index];
        tracing::trace!("dx12_samples::sync:: wait for gpu, signal {}", value);

        self.timeline.signal(value)?;
        // recorded before the wait, a value is never signalled twice even if the wait fails
        self.fence_values[self.frame_index] = value + 1;

        self.timeline.wait(value)
    }

    /// Signals the end of the current frame then moves to `next_index`, waiting only if the gpu
    /// is still using the resources of that frame.
    pub fn wait_for_next_frame(&mut self, next_index: usize) -> Result<(), Error> {
        if next_index >= self.fence_values.len() {
            return Err(Error {
                msg: format!(
                    "dx12_samples::sync:: frame index {} out of range for {} buffers",
                    next_index, self.fence_values.len())
            });
        }

        let value = self.fence_values[self.frame_index];
        self.timeline.signal(value)?;

        let target = self.fence_values[next_index];
        self.frame_index = next_index;
        self.fence_values[next_index] = value + 1;

        let completed = self.timeline.completed_value();
        if completed < target {
            tracing::trace!(
                "dx12_samples::sync:: frame {} waiting for {} (completed {})",
                next_index, target, completed);
            self.timeline.wait(target)?;
        }
        Ok(())
    }

    /// Index of the frame (back buffer) currently being recorded.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Fence value of frame `index`: for the current frame the value its end will signal,
    /// for the others the value their last submission signalled.
    pub fn fence_value(&self, index: usize) -> u64 {
        self.fence_values[index]
    }

    pub fn num_buffers(&self) -> usize {
        self.fence_values.len()
    }

    pub fn timeline(&self) -> &T {
        &self.timeline
    }
}

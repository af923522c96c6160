use dx12_samples::sync::soft;
use dx12_samples::sync::FrameSync;
use dx12_samples::sync::Timeline;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn soft_frame_sync(num_buffers: usize, frame_index: usize) -> FrameSync<soft::Timeline> {
    FrameSync::new(soft::Timeline::new(soft::Retire::OnWait), num_buffers, frame_index).unwrap()
}

#[test]
fn new_bumps_current_frame_only() {
    let fs = soft_frame_sync(2, 0);
    assert_eq!(fs.num_buffers(), 2);
    assert_eq!(fs.frame_index(), 0);
    assert_eq!(fs.fence_value(0), 1);
    assert_eq!(fs.fence_value(1), 0);

    let fs = soft_frame_sync(3, 1);
    assert_eq!(fs.fence_value(0), 0);
    assert_eq!(fs.fence_value(1), 1);
    assert_eq!(fs.fence_value(2), 0);
}

#[test]
fn new_rejects_bad_buffer_counts() {
    assert!(FrameSync::new(soft::Timeline::new(soft::Retire::OnWait), 0, 0).is_err());
    assert!(FrameSync::new(soft::Timeline::new(soft::Retire::OnWait), 2, 2).is_err());
}

#[test]
fn wait_for_gpu_flushes() {
    let mut fs = soft_frame_sync(2, 0);
    fs.wait_for_gpu().unwrap();

    assert_eq!(fs.timeline().signalled(), vec![1]);
    assert_eq!(fs.timeline().waits(), vec![1]);
    assert_eq!(fs.timeline().completed_value(), 1);
    assert_eq!(fs.timeline().pending(), 0);
    assert_eq!(fs.fence_value(0), 2);
    assert_eq!(fs.frame_index(), 0);
}

#[test]
fn double_buffered_frames() {
    let mut fs = soft_frame_sync(2, 0);

    // init uploads
    fs.wait_for_gpu().unwrap();

    // frame 1 was never used so there is nothing to wait for
    fs.wait_for_next_frame(1).unwrap();
    assert_eq!(fs.frame_index(), 1);
    assert_eq!(fs.fence_value(1), 3);
    assert_eq!(fs.timeline().waits(), vec![1]);

    // back on frame 0, whose last submission signalled 2 and has not completed
    fs.wait_for_next_frame(0).unwrap();
    assert_eq!(fs.frame_index(), 0);
    assert_eq!(fs.fence_value(0), 4);
    assert_eq!(fs.timeline().signalled(), vec![1, 2, 3]);
    assert_eq!(fs.timeline().waits(), vec![1, 2]);
    assert_eq!(fs.timeline().completed_value(), 2);

    fs.wait_for_next_frame(1).unwrap();
    assert_eq!(fs.timeline().signalled(), vec![1, 2, 3, 4]);
    assert_eq!(fs.timeline().waits(), vec![1, 2, 3]);
    assert_eq!(fs.fence_value(1), 5);
}

#[test]
fn signals_strictly_increase() {
    let mut fs = soft_frame_sync(3, 0);
    fs.wait_for_gpu().unwrap();
    for frame in 1..100 {
        fs.wait_for_next_frame(frame % 3).unwrap();
    }
    fs.wait_for_gpu().unwrap();

    let signalled = fs.timeline().signalled();
    assert_eq!(signalled.len(), 101);
    assert!(signalled.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(fs.timeline().completed_value(), *signalled.last().unwrap());
}

#[test]
fn no_wait_when_gpu_is_ahead() {
    let timeline = soft::Timeline::new(soft::Retire::Manual);
    let gpu = timeline.gpu();
    let mut fs = FrameSync::new(timeline, 2, 0).unwrap();

    for frame in 1..10 {
        fs.wait_for_next_frame(frame % 2).unwrap();
        gpu.retire_all();
    }
    assert!(fs.timeline().waits().is_empty());
    assert_eq!(fs.timeline().signalled().len(), 9);
}

#[test]
fn next_frame_out_of_range() {
    let mut fs = soft_frame_sync(2, 0);
    assert!(fs.wait_for_next_frame(2).is_err());

    // nothing was signalled and the frame did not move
    assert!(fs.timeline().signalled().is_empty());
    assert_eq!(fs.frame_index(), 0);
    assert_eq!(fs.fence_value(0), 1);
}

#[test]
fn single_buffer_waits_every_frame() {
    let mut fs = soft_frame_sync(1, 0);
    for _ in 0..4 {
        fs.wait_for_next_frame(0).unwrap();
    }
    assert_eq!(fs.timeline().signalled(), vec![1, 2, 3, 4]);
    assert_eq!(fs.timeline().waits(), vec![1, 2, 3, 4]);
}

#[test]
fn soft_timeline_rejects_unsignalled_wait() {
    let mut timeline = soft::Timeline::new(soft::Retire::OnWait);
    timeline.signal(1).unwrap();
    let err = timeline.wait(2).unwrap_err();
    assert!(err.msg.contains("never signalled"));
}

#[test]
fn soft_timeline_rejects_non_increasing_signal() {
    let mut timeline = soft::Timeline::new(soft::Retire::OnWait);
    timeline.signal(3).unwrap();
    assert!(timeline.signal(3).is_err());
    assert!(timeline.signal(2).is_err());
    assert!(timeline.signal(4).is_ok());
}

#[test]
fn soft_gpu_retires_in_order() {
    let mut timeline = soft::Timeline::new(soft::Retire::Manual);
    let gpu = timeline.gpu();
    timeline.signal(1).unwrap();
    timeline.signal(5).unwrap();

    assert_eq!(gpu.retire_one(), Some(1));
    assert_eq!(timeline.completed_value(), 1);
    assert_eq!(gpu.retire_one(), Some(5));
    assert_eq!(gpu.retire_one(), None);
    assert_eq!(gpu.completed_value(), 5);
    assert_eq!(gpu.retire_next(Duration::from_millis(1)), None);
}

#[test]
fn frames_against_threaded_gpu() {
    let timeline = soft::Timeline::new(soft::Retire::Manual);
    let gpu = timeline.gpu();
    let stop = Arc::new(AtomicBool::new(false));

    let gpu_thread = {
        let gpu = gpu.clone();
        let stop = stop.clone();
        std::thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                if gpu.retire_next(Duration::from_millis(5)).is_some() {
                    std::thread::sleep(Duration::from_micros(200));
                }
            }
        })
    };

    let mut fs = FrameSync::new(timeline, 3, 0).unwrap();
    fs.wait_for_gpu().unwrap();

    for frame in 1..200 {
        let next = frame % 3;
        // the gpu must be done with the last submission of `next` before the cpu reuses it
        let last_use = fs.fence_value(next);
        fs.wait_for_next_frame(next).unwrap();
        assert!(gpu.completed_value() >= last_use);
    }

    fs.wait_for_gpu().unwrap();
    let last = *fs.timeline().signalled().last().unwrap();
    assert_eq!(gpu.completed_value(), last);
    assert_eq!(fs.timeline().pending(), 0);

    stop.store(true, Ordering::Release);
    gpu_thread.join().unwrap();
}

/// Soft timeline whose next `wait` fails, like a lost device.
struct FlakyTimeline {
    inner: soft::Timeline,
    fail_next_wait: std::cell::Cell<bool>,
}

impl FlakyTimeline {
    fn new() -> Self {
        FlakyTimeline {
            inner: soft::Timeline::new(soft::Retire::OnWait),
            fail_next_wait: std::cell::Cell::new(false),
        }
    }
}

impl Timeline for FlakyTimeline {
    fn signal(&mut self, value: u64) -> Result<(), dx12_samples::Error> {
        self.inner.signal(value)
    }

    fn completed_value(&self) -> u64 {
        self.inner.completed_value()
    }

    fn wait(&self, value: u64) -> Result<(), dx12_samples::Error> {
        if self.fail_next_wait.replace(false) {
            return Err(dx12_samples::Error { msg: "wait failed".to_string() });
        }
        self.inner.wait(value)
    }
}

#[test]
fn failed_frame_wait_keeps_signals_increasing() {
    let mut fs = FrameSync::new(FlakyTimeline::new(), 2, 0).unwrap();
    fs.wait_for_next_frame(1).unwrap();

    fs.timeline().fail_next_wait.set(true);
    assert!(fs.wait_for_next_frame(0).is_err());
    assert_eq!(fs.frame_index(), 0);
    assert_eq!(fs.fence_value(0), 3);

    // the flush on quit signals past everything already signalled
    fs.wait_for_gpu().unwrap();
    assert_eq!(fs.timeline().inner.signalled(), vec![1, 2, 3]);
    assert_eq!(fs.timeline().inner.completed_value(), 3);
}

#[test]
fn failed_flush_keeps_signals_increasing() {
    let mut fs = FrameSync::new(FlakyTimeline::new(), 2, 0).unwrap();

    fs.timeline().fail_next_wait.set(true);
    assert!(fs.wait_for_gpu().is_err());
    assert_eq!(fs.fence_value(0), 2);

    fs.wait_for_gpu().unwrap();
    assert_eq!(fs.timeline().inner.signalled(), vec![1, 2]);
    assert_eq!(fs.timeline().inner.pending(), 0);
}

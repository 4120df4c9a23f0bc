//! Acquisition on a worker thread
//!
//! The wrapped source runs on its own thread and hands frames over a bounded
//! channel, so a slow consumer blocks the producer instead of queueing frames
//! without limit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{FrameSource, SourceError};
use crate::pose::LandmarkFrame;

enum Message {
    Frame(LandmarkFrame),
    End,
    Failed(SourceError),
}

/// スレッド終了時 (panic を含む) に内側のソースを1回だけ解放する
struct ReleaseOnDrop<S: FrameSource>(S);

impl<S: FrameSource> Drop for ReleaseOnDrop<S> {
    fn drop(&mut self) {
        self.0.release();
    }
}

pub struct ThreadedSource {
    frames: Option<Receiver<Message>>,
    ready: Option<Receiver<Result<(), SourceError>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl ThreadedSource {
    /// `inner` を別スレッドで回す。`depth` は受け渡しキューの長さ
    pub fn spawn<S>(inner: S, depth: usize) -> Result<Self, SourceError>
    where
        S: FrameSource + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::sync_channel::<Message>(depth.max(1));
        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_ref = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("frame-acquisition".into())
            .spawn(move || {
                let mut source = ReleaseOnDrop(inner);

                let ready = source.0.wait_ready();
                let ok = ready.is_ok();
                let _ = ready_tx.send(ready);
                if !ok {
                    return;
                }

                while running_ref.load(Ordering::Acquire) {
                    let msg = match source.0.next_frame() {
                        Ok(Some(frame)) => Message::Frame(frame),
                        Ok(None) => Message::End,
                        Err(e) => Message::Failed(e),
                    };
                    let last = !matches!(msg, Message::Frame(_));
                    // 受信側が閉じていれば終了
                    if frame_tx.send(msg).is_err() || last {
                        break;
                    }
                }
                tracing::debug!("acquisition thread exiting");
            })?;

        Ok(Self {
            frames: Some(frame_rx),
            ready: Some(ready_rx),
            running,
            handle: Some(handle),
            finished: false,
        })
    }

    /// ワーカーがまだ動いているか
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.finished
    }
}

impl FrameSource for ThreadedSource {
    fn wait_ready(&mut self) -> Result<(), SourceError> {
        let Some(ready) = self.ready.take() else {
            return Ok(());
        };
        match ready.recv() {
            Ok(result) => result,
            Err(_) => Err(SourceError::Disconnected),
        }
    }

    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        let Some(frames) = self.frames.as_ref() else {
            return Ok(None);
        };
        match frames.recv() {
            Ok(Message::Frame(frame)) => Ok(Some(frame)),
            Ok(Message::End) => {
                self.finished = true;
                Ok(None)
            }
            Ok(Message::Failed(e)) => {
                self.finished = true;
                Err(e)
            }
            Err(_) => {
                self.finished = true;
                Err(SourceError::Disconnected)
            }
        }
    }

    fn release(&mut self) {
        self.running.store(false, Ordering::Release);
        // 受信側を先に落として送信待ちのワーカーを起こす
        self.frames = None;
        self.ready = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("acquisition thread panicked");
            }
        }
    }
}

impl Drop for ThreadedSource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};
    use std::sync::atomic::AtomicUsize;

    fn frame(index: u64) -> LandmarkFrame {
        LandmarkFrame::new(index, index * 33, [Landmark::default(); LandmarkIndex::COUNT])
    }

    /// `limit` 枚 (None なら無限) 返した後に `fail` なら失敗する
    struct Scripted {
        next: u64,
        limit: Option<u64>,
        fail: bool,
        not_ready: bool,
        panic_at: Option<u64>,
        released: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(limit: Option<u64>, released: &Arc<AtomicUsize>) -> Self {
            Self {
                next: 0,
                limit,
                fail: false,
                not_ready: false,
                panic_at: None,
                released: Arc::clone(released),
            }
        }
    }

    impl FrameSource for Scripted {
        fn wait_ready(&mut self) -> Result<(), SourceError> {
            if self.not_ready {
                Err(SourceError::Device("no camera".into()))
            } else {
                Ok(())
            }
        }

        fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
            if self.panic_at == Some(self.next) {
                panic!("producer crashed");
            }
            if self.limit.is_some_and(|l| self.next >= l) {
                return if self.fail {
                    Err(SourceError::Device("unplugged".into()))
                } else {
                    Ok(None)
                };
            }
            self.next += 1;
            Ok(Some(frame(self.next - 1)))
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_delivers_all_frames_in_order() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut src = ThreadedSource::spawn(Scripted::new(Some(5), &released), 2).unwrap();
        src.wait_ready().unwrap();
        let mut got = Vec::new();
        while let Some(f) = src.next_frame().unwrap() {
            got.push(f.index());
        }
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        src.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_stops_infinite_producer() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut src = ThreadedSource::spawn(Scripted::new(None, &released), 1).unwrap();
        src.wait_ready().unwrap();
        for i in 0..10 {
            assert_eq!(src.next_frame().unwrap().map(|f| f.index()), Some(i));
        }
        src.release();
        assert!(!src.is_running());
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(src.next_frame().unwrap().is_none());

        // 二重解放しても内側の解放は1回
        src.release();
        drop(src);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_forwarded() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut inner = Scripted::new(Some(2), &released);
        inner.fail = true;
        let mut src = ThreadedSource::spawn(inner, 2).unwrap();
        src.wait_ready().unwrap();
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_some());
        assert!(matches!(src.next_frame(), Err(SourceError::Device(_))));
        assert!(src.next_frame().unwrap().is_none());
        drop(src);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_ready() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut inner = Scripted::new(Some(2), &released);
        inner.not_ready = true;
        let mut src = ThreadedSource::spawn(inner, 2).unwrap();
        assert!(matches!(src.wait_ready(), Err(SourceError::Device(_))));
        src.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_producer_still_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut inner = Scripted::new(None, &released);
        inner.panic_at = Some(1);
        let mut src = ThreadedSource::spawn(inner, 2).unwrap();
        src.wait_ready().unwrap();
        assert_eq!(src.next_frame().unwrap().map(|f| f.index()), Some(0));
        assert!(matches!(src.next_frame(), Err(SourceError::Disconnected)));
        src.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}

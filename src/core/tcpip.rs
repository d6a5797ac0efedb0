//! The network processing context.
//!
//! All frame input runs on one dedicated thread. Other contexts post jobs to
//! it through a bounded mailbox.

use std::sync::mpsc::{
    self,
    Receiver,
    SyncSender,
    TrySendError,
};
use std::thread::{
    self,
    JoinHandle,
};

use {
    Error,
    Result,
};

type Job = Box<FnOnce() + Send>;

enum Message {
    Job(Job),
    Stop,
}

/// Owner of the network processing thread. Dropping it lets the thread run
/// the jobs already posted, then stops and joins it.
pub struct NetContext {
    handle: Option<Handle>,
    thread: Option<JoinHandle<()>>,
}

/// Cloneable entry point for posting jobs to the network processing thread.
#[derive(Clone)]
pub struct Handle {
    mailbox: SyncSender<Message>,
}

impl NetContext {
    /// Spawns the network processing thread with a mailbox holding at most
    /// mailbox_len undelivered jobs.
    ///
    /// # Errors
    ///
    /// An IO error if the thread could not be spawned.
    pub fn spawn(mailbox_len: usize) -> Result<NetContext> {
        let (mailbox, messages) = mpsc::sync_channel(mailbox_len);
        let worker = thread::Builder::new()
            .name(String::from("tcpip"))
            .spawn(move || run(messages))?;

        Ok(NetContext {
            handle: Some(Handle { mailbox }),
            thread: Some(worker),
        })
    }

    pub fn handle(&self) -> Handle {
        match self.handle {
            Some(ref handle) => handle.clone(),
            None => unreachable!(),
        }
    }
}

impl Drop for NetContext {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.mailbox.send(Message::Stop);
        }

        if let Some(worker) = self.thread.take() {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                error!("Network processing thread panicked.");
            }
        }
    }
}

fn run(messages: Receiver<Message>) {
    debug!("Network processing context started.");
    for message in messages.iter() {
        match message {
            Message::Job(job) => job(),
            Message::Stop => break,
        }
    }
    debug!("Network processing context stopped.");
}

impl Handle {
    /// Posts f to run on the network processing thread without waiting for
    /// it. If the job can't be posted it is dropped along with everything it
    /// owns.
    ///
    /// # Errors
    ///
    /// `Error::Exhausted` if the mailbox is full, `Error::NotReady` if the
    /// network processing thread is gone.
    pub fn callback<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.mailbox.try_send(Message::Job(Box::new(f))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::Exhausted),
            Err(TrySendError::Disconnected(_)) => Err(Error::NotReady),
        }
    }

    /// Runs f on the network processing thread and waits for its result.
    /// Every job posted before returns first.
    ///
    /// # Errors
    ///
    /// `Error::NotReady` if the network processing thread is gone.
    pub fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, res) = mpsc::channel();
        let job: Job = Box::new(move || {
            let _ = reply.send(f());
        });

        self.mailbox
            .send(Message::Job(job))
            .map_err(|_| Error::NotReady)?;
        res.recv().map_err(|_| Error::NotReady)
    }
}

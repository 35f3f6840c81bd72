//! Single-threaded apartment for automation calls
//!
//! The automation interface is not safe for concurrent use. The backend is
//! created on one dedicated thread and only touched there; every other
//! thread sends closures to it and waits for the result.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

type Job<A> = Box<dyn FnOnce(&mut A) + Send>;

enum Message<A> {
    Run(Job<A>),
    Shutdown,
}

/// Apartment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApartmentError {
    #[error("Failed to spawn apartment thread: {0}")]
    Spawn(String),
    #[error("Apartment thread is closed")]
    Closed,
}

/// Cloneable sender side of an [`ApartmentThread`]
pub struct ApartmentHandle<A> {
    sender: mpsc::Sender<Message<A>>,
}

impl<A> Clone for ApartmentHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: 'static> ApartmentHandle<A> {
    /// Run `f` on the apartment thread and wait for its result
    pub fn call<R, F>(&self, f: F) -> Result<R, ApartmentError>
    where
        F: FnOnce(&mut A) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, result) = mpsc::channel();
        let job: Job<A> = Box::new(move |backend| {
            // The caller may have given up waiting.
            let _ = reply.send(f(backend));
        });
        self.sender
            .send(Message::Run(job))
            .map_err(|_| ApartmentError::Closed)?;
        result.recv().map_err(|_| ApartmentError::Closed)
    }
}

/// Owner of the thread that owns the automation backend
pub struct ApartmentThread<A> {
    handle: ApartmentHandle<A>,
    thread: Option<JoinHandle<A>>,
}

impl<A: Send + 'static> ApartmentThread<A> {
    /// Spawn the apartment; `factory` builds the backend on the new thread
    pub fn spawn<F>(name: &str, factory: F) -> Result<Self, ApartmentError>
    where
        F: FnOnce() -> A + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Message<A>>();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut backend = factory();
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Run(job) => job(&mut backend),
                        Message::Shutdown => break,
                    }
                }
                tracing::debug!("Apartment thread stopped");
                backend
            })
            .map_err(|e| ApartmentError::Spawn(e.to_string()))?;

        Ok(Self {
            handle: ApartmentHandle { sender },
            thread: Some(thread),
        })
    }

    /// A cloneable handle for other threads
    pub fn handle(&self) -> ApartmentHandle<A> {
        self.handle.clone()
    }

    /// Run `f` on the apartment thread and wait for its result
    pub fn call<R, F>(&self, f: F) -> Result<R, ApartmentError>
    where
        F: FnOnce(&mut A) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.call(f)
    }

    /// Stop the thread and take the backend back
    pub fn join(mut self) -> Result<A, ApartmentError> {
        let _ = self.handle.sender.send(Message::Shutdown);
        let thread = self.thread.take().ok_or(ApartmentError::Closed)?;
        thread.join().map_err(|_| ApartmentError::Closed)
    }
}

impl<A> Drop for ApartmentThread<A> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.sender.send(Message::Shutdown);
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_run_on_one_thread() {
        let apartment =
            ApartmentThread::spawn("test-apartment", || Vec::<thread::ThreadId>::new()).unwrap();
        let handle = apartment.handle();

        let worker = thread::spawn(move || {
            handle
                .call(|ids| ids.push(thread::current().id()))
                .unwrap()
        });
        worker.join().unwrap();
        apartment
            .call(|ids| ids.push(thread::current().id()))
            .unwrap();

        let ids = apartment.join().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0], thread::current().id());
    }

    #[test]
    fn test_call_after_join_fails() {
        let apartment = ApartmentThread::spawn("test-apartment", || 0u32).unwrap();
        let handle = apartment.handle();
        assert_eq!(apartment.join().unwrap(), 0);
        assert_eq!(handle.call(|n| *n), Err(ApartmentError::Closed));
    }
}

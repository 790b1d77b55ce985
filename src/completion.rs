//! 一次性完成回调 (Completion handle)
//!
//! 检测器/跟踪器每次调用拿到一个 `Completion`, 在任意线程上调用 `complete`
//! 恰好一次. 如果实现方丢弃它而没有调用, Drop 会补发 `Error::CompletionDropped`,
//! 保证调用方总能收到结果.

use std::fmt;

use crate::{Error, Result};

pub struct Completion<T> {
    callback: Option<Box<dyn FnOnce(Result<T>) + Send + 'static>>,
}

impl<T> Completion<T> {
    pub fn new(callback: impl FnOnce(Result<T>) + Send + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn complete(mut self, result: Result<T>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, error: Error) {
        self.complete(Err(error));
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(Error::CompletionDropped));
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

//! Reading message attachments as reactive sources.
//!
//! An attachment is opened remotely and then read with blocking I/O. The
//! blocking part always runs on a [`BlockingSpawn`] pool, by default the
//! process-wide [`ElasticPool`], so neither the subscribing thread nor the
//! future scheduler is ever blocked on a download.

use std::{
  fs::File,
  io::{self, BufRead, BufReader, Read, Write},
  path::PathBuf,
  string::FromUtf8Error,
  sync::{Arc, Mutex},
};

use futures::{channel::oneshot, future::BoxFuture, task::Spawn, FutureExt};
use thiserror::Error;
use tracing::trace;

use crate::{
  observable::{from_operation, from_operation_iter, FromOperation, FromOperationIter, RemoteOperation},
  scheduler::{BlockingSpawn, ElasticPool},
};

/// Blocking reader over an attachment's content.
pub type AttachmentStream = Box<dyn Read + Send>;

/// A file attached to a remote message.
pub trait Attachment: Send + Sync + 'static {
  type Error: Send + 'static;

  /// The file name the uploader gave the attachment.
  fn file_name(&self) -> &str;

  /// Opens the attachment for reading.
  fn retrieve_input_stream(&self) -> BoxFuture<'static, Result<AttachmentStream, Self::Error>>;
}

#[derive(Debug, Error)]
pub enum AttachmentError<E> {
  #[error("retrieving the attachment failed: {0:?}")]
  Remote(E),
  #[error("reading the attachment failed")]
  Io(#[from] io::Error),
  #[error("attachment content is not valid UTF-8")]
  Decode(#[from] FromUtf8Error),
}

type ReadFn<T, E> = Arc<dyn Fn(AttachmentStream) -> Result<T, AttachmentError<E>> + Send + Sync>;

/// Opens an attachment and runs a blocking read over it on a pool.
pub struct BlockingRead<A: Attachment, T, P> {
  attachment: A,
  pool: P,
  read: ReadFn<T, A::Error>,
}

impl<A, T, P> RemoteOperation for BlockingRead<A, T, P>
where
  A: Attachment,
  T: Send + 'static,
  P: BlockingSpawn,
{
  type Output = T;
  type Error = AttachmentError<A::Error>;

  fn submit(&self) -> BoxFuture<'static, Result<T, AttachmentError<A::Error>>> {
    let open = self.attachment.retrieve_input_stream();
    let pool = self.pool.clone();
    let read = self.read.clone();
    async move {
      let stream = open.await.map_err(AttachmentError::Remote)?;
      let (tx, rx) = oneshot::channel();
      pool.spawn_blocking(Box::new(move || {
        let _ = tx.send(read(stream));
      }));
      rx.await
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Interrupted, "blocking read was abandoned").into()))
    }
    .boxed()
  }
}

/// Source of a single value read from an attachment.
pub type AttachmentSource<A, T, S> = FromOperation<BlockingRead<A, T, ElasticPool>, S>;

fn read_all<E>(mut stream: AttachmentStream) -> Result<Vec<u8>, AttachmentError<E>> {
  let mut buffer = Vec::new();
  stream.read_to_end(&mut buffer)?;
  trace!(bytes = buffer.len(), "attachment read");
  Ok(buffer)
}

/// Reactive conversions over an [`Attachment`].
pub trait AttachmentExt: Attachment + Sized {
  /// Run `read` over the opened attachment on `pool`.
  fn read_blocking<T, P, S, F>(self, pool: P, scheduler: S, read: F) -> FromOperation<BlockingRead<Self, T, P>, S>
  where
    T: Send + 'static,
    P: BlockingSpawn,
    S: Spawn,
    F: Fn(AttachmentStream) -> Result<T, AttachmentError<Self::Error>> + Send + Sync + 'static,
  {
    from_operation(BlockingRead { attachment: self, pool, read: Arc::new(read) }, scheduler)
  }

  /// The whole content as bytes.
  fn to_byte_array<S: Spawn>(self, scheduler: S) -> AttachmentSource<Self, Vec<u8>, S> {
    self.read_blocking(ElasticPool::global(), scheduler, read_all)
  }

  /// The whole content decoded as UTF-8.
  fn to_text<S: Spawn>(self, scheduler: S) -> AttachmentSource<Self, String, S> {
    self.read_blocking(ElasticPool::global(), scheduler, |stream| Ok(String::from_utf8(read_all(stream)?)?))
  }

  /// Every line of the content, without line terminators.
  fn to_lines<S: Spawn>(self, scheduler: S) -> FromOperationIter<BlockingRead<Self, Vec<String>, ElasticPool>, S> {
    let read: ReadFn<Vec<String>, Self::Error> = Arc::new(|stream: AttachmentStream| {
      BufReader::new(stream)
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(AttachmentError::from)
    });
    from_operation_iter(BlockingRead { attachment: self, pool: ElasticPool::global(), read }, scheduler)
  }

  /// Copy the content into `writer` and emit the number of bytes copied.
  ///
  /// The writer is consumed by the first subscription; later subscriptions
  /// fail with an I/O error.
  fn copy_to<W, S>(self, writer: W, scheduler: S) -> AttachmentSource<Self, u64, S>
  where
    W: Write + Send + 'static,
    S: Spawn,
  {
    let writer = Mutex::new(Some(writer));
    self.read_blocking(ElasticPool::global(), scheduler, move |mut stream| {
      let mut writer = writer
        .lock()
        .unwrap()
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer was already consumed"))?;
      let copied = io::copy(&mut stream, &mut writer)?;
      writer.flush()?;
      Ok(copied)
    })
  }

  /// Download the content to `path`, or to the attachment's file name in the
  /// working directory, and emit the path written.
  fn to_file<S: Spawn>(self, path: Option<PathBuf>, scheduler: S) -> AttachmentSource<Self, PathBuf, S> {
    let target = path.unwrap_or_else(|| PathBuf::from(self.file_name()));
    self.read_blocking(ElasticPool::global(), scheduler, move |mut stream| {
      let mut file = File::create(&target)?;
      io::copy(&mut stream, &mut file)?;
      file.sync_all()?;
      Ok(target.clone())
    })
  }
}

impl<A: Attachment> AttachmentExt for A {}

//! Access to the outside world, injected into symbol sources.
//!
//! Symbol sources never touch the network, the file system or child processes directly. They go
//! through the traits in this module instead, which allows embedders to route requests through
//! their own infrastructure and tests to substitute fakes.

use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use profsym_common::ByteView;

/// Size of the buffer used to read tool output.
const TOOL_OUTPUT_CHUNK: usize = 64 * 1024;

/// The response of a [`SymbolFetcher`] to a symbol file request.
pub enum FetchResponse {
    /// The server returned the symbol file.
    Found(ByteView<'static>),
    /// The server does not know the symbol file.
    NotFound,
    /// The server answered with an unexpected status code.
    Status(u16),
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(data) => f.debug_tuple("Found").field(&data.len()).finish(),
            Self::NotFound => write!(f, "NotFound"),
            Self::Status(status) => f.debug_tuple("Status").field(status).finish(),
        }
    }
}

/// An error returned when a request to a symbol server could not be completed.
#[derive(Debug, Error)]
#[error("failed to fetch {url}")]
pub struct FetchError {
    url: String,
    #[source]
    source: Box<dyn Error + Send + Sync + 'static>,
}

impl FetchError {
    /// Creates a new fetch error for the given URL.
    pub fn new<E>(url: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        FetchError {
            url: url.into(),
            source: source.into(),
        }
    }

    /// The URL that could not be fetched.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Downloads symbol files from a symbol server.
#[async_trait]
pub trait SymbolFetcher: Send + Sync {
    /// Requests the resource at `url`.
    ///
    /// Transport errors are returned as [`FetchError`]. Any response from the server, including
    /// error statuses, is returned as a [`FetchResponse`].
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Reads files from the local file system.
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Reads the entire file at `path`.
    async fn read(&self, path: &Path) -> io::Result<ByteView<'static>>;
}

/// A [`FileReader`] that memory maps local files.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileReader;

#[async_trait]
impl FileReader for LocalFileReader {
    async fn read(&self, path: &Path) -> io::Result<ByteView<'static>> {
        let path = path.to_owned();
        tokio::task::spawn_blocking(move || ByteView::open(path))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

/// Receives the standard output of a tool, chunk by chunk.
///
/// A chunk is only valid for the duration of the call that receives it.
pub type OutputCallback<'a> = dyn for<'c> FnMut(&'c [u8]) + Send + 'a;

/// Runs external command line tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs `program` with `args` to completion.
    ///
    /// The standard output of the program is passed to `on_chunk` as it is produced, in chunks of
    /// arbitrary size. Standard error is discarded. Returns the exit status once the program has
    /// terminated.
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        on_chunk: &mut OutputCallback<'_>,
    ) -> io::Result<ExitStatus>;
}

/// A [`ToolRunner`] that spawns child processes.
///
/// The child has always exited when `run` returns, also if reading its output fails. Children
/// are killed if the returned future is dropped before they exit.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessToolRunner;

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        on_chunk: &mut OutputCallback<'_>,
    ) -> io::Result<ExitStatus> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let output = match child.stdout.take() {
            Some(stdout) => forward_output(stdout, on_chunk).await,
            None => Ok(()),
        };

        reap(&mut child, output).await
    }
}

/// Passes everything `reader` produces to `on_chunk`.
async fn forward_output<R>(mut reader: R, on_chunk: &mut OutputCallback<'_>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0; TOOL_OUTPUT_CHUNK];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        on_chunk(&buffer[..read]);
    }
}

/// Waits for `child` to exit.
///
/// If its output could not be read, the child is killed first and the read error is returned.
async fn reap(child: &mut Child, output: io::Result<()>) -> io::Result<ExitStatus> {
    if let Err(error) = output {
        // `kill` waits for the process to exit.
        if let Err(kill_error) = child.kill().await {
            tracing::debug!(error = &kill_error as &dyn Error, "failed to kill tool");
        }
        return Err(error);
    }

    child.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[tokio::test]
    async fn test_local_file_reader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MODULE Linux x86_64 ABCD libfoo.so\n").unwrap();

        let view = LocalFileReader.read(file.path()).await.unwrap();
        assert_eq!(&*view, b"MODULE Linux x86_64 ABCD libfoo.so\n");
    }

    #[tokio::test]
    async fn test_local_file_reader_missing() {
        let dir = tempfile::tempdir().unwrap();
        let error = LocalFileReader
            .read(&dir.path().join("missing.sym"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_process_tool_runner() {
        let mut output = Vec::new();
        let status = ProcessToolRunner
            .run("echo", &["hello".into()], &mut |chunk| {
                output.extend_from_slice(chunk)
            })
            .await
            .unwrap();

        assert!(status.success());
        assert_eq!(output, b"hello\n");
    }

    /// A reader whose underlying pipe broke.
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }
    }

    #[tokio::test]
    async fn test_forward_output_read_error() {
        let mut output = Vec::new();
        let reader = (&b"0000000000001000 T _init\n"[..]).chain(BrokenPipe);
        let error = forward_output(reader, &mut |chunk| output.extend_from_slice(chunk))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(output, b"0000000000001000 T _init\n");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_reap_kills_child_on_read_error() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let error = reap(&mut child, Err(io::ErrorKind::BrokenPipe.into()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);

        // The child has already been waited for.
        let status = child.try_wait().unwrap().unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_reap_waits_for_child() {
        let mut child = Command::new("sh")
            .args(["-c", "exit 3"])
            .spawn()
            .unwrap();

        let status = reap(&mut child, Ok(())).await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_process_tool_runner_large_output() {
        let mut received = 0;
        let status = ProcessToolRunner
            .run(
                "head",
                &["-c".into(), "200000".into(), "/dev/zero".into()],
                &mut |chunk| received += chunk.len(),
            )
            .await
            .unwrap();

        assert!(status.success());
        assert_eq!(received, 200_000);
    }

    #[tokio::test]
    async fn test_process_tool_runner_missing_program() {
        let result = ProcessToolRunner
            .run("profsym-no-such-tool", &[], &mut |_| ())
            .await;
        assert!(result.is_err());
    }
}

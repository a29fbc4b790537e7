//! 文件句柄抽象
//!
//! 扫描器只需要句柄提供：路径、大小查询、可选的 OS 文件描述符、字节流读取。
//! 能力在扫描开始时通过 `source()` 一次性确定：真实文件走描述符扫描，其余走缓冲扫描。
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// 句柄元数据（目前只需大小）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
}

/// 扫描数据来源
pub enum ScanSource<'a> {
    /// 背后是真实的 OS 文件
    Descriptor(&'a File),
    /// 只能按字节流读取（虚拟 / 内存文件系统等）
    Stream(&'a mut dyn Read),
}

/// 由宿主提供的文件句柄；扫描器只借用，不负责关闭
pub trait FileHandle {
    fn path(&self) -> &Path;
    fn stat(&self) -> io::Result<FileInfo>;
    fn source(&mut self) -> ScanSource<'_>;
}

/// 真实文件句柄
#[derive(Debug)]
pub struct OsFile {
    path: PathBuf,
    file: File,
}

impl OsFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    /// 包装已打开的文件
    pub fn from_parts(path: impl Into<PathBuf>, file: File) -> Self {
        Self { path: path.into(), file }
    }
}

impl FileHandle for OsFile {
    fn path(&self) -> &Path { &self.path }

    fn stat(&self) -> io::Result<FileInfo> {
        Ok(FileInfo { size: self.file.metadata()?.len() })
    }

    fn source(&mut self) -> ScanSource<'_> {
        ScanSource::Descriptor(&self.file)
    }
}

/// 内存文件句柄（无 OS 描述符）；`close()` 之后 stat / read 都会失败
#[derive(Debug, Clone)]
pub struct MemFile {
    path: PathBuf,
    data: Cursor<Vec<u8>>,
    closed: bool,
}

impl MemFile {
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self { path: path.into(), data: Cursor::new(data.into()), closed: false }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    fn closed_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "file already closed")
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Self::closed_error());
        }
        self.data.read(buf)
    }
}

impl FileHandle for MemFile {
    fn path(&self) -> &Path { &self.path }

    fn stat(&self) -> io::Result<FileInfo> {
        if self.closed {
            return Err(Self::closed_error());
        }
        Ok(FileInfo { size: self.data.get_ref().len() as u64 })
    }

    fn source(&mut self) -> ScanSource<'_> {
        ScanSource::Stream(self)
    }
}

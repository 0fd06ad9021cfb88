pub use grid::*;

use {
    memmap::Mmap,
    nom::IResult,
    std::{
        fs::File,
        io::{Error, ErrorKind, Result as IoResult},
        str::{from_utf8, Utf8Error},
    },
};

mod grid;

/// Opens a memory-mapped UTF-8 file at a specified path, and passes in a `&str` over the file to a
/// provided callback function
///
/// # Errors
///
/// This function returns a `Result::Err`-wrapped `std::io::Error` if an error has occurred.
/// Possible causes are:
///
/// * `std::fs::File::open` was unable to open a read-only file at `file_path`
/// * `memmap::Mmap::map` fails to create an `Mmap` instance for the opened file
/// * `std::str::from_utf8` determines the file is not in valid UTF-8 format
///
/// `f` is only executed *iff* an error is not encountered.
///
/// # Safety
///
/// This function uses `Mmap::map`, which is an unsafe function. There is no guarantee that an
/// external process won't modify the file after it is opened as read-only, which would invalidate
/// the immutable string slice handed to `f`.
pub unsafe fn open_utf8_file<T, F: FnOnce(&str) -> T>(file_path: &str, f: F) -> IoResult<T> {
    let file: File = File::open(file_path)?;

    // SAFETY: This operation is unsafe
    let mmap: Mmap = Mmap::map(&file)?;
    let bytes: &[u8] = &mmap;
    let utf8_str: &str = from_utf8(bytes).map_err(|utf8_error: Utf8Error| -> Error {
        Error::new(ErrorKind::InvalidData, utf8_error)
    })?;

    Ok(f(utf8_str))
}

pub trait Parse: Sized {
    fn parse<'i>(input: &'i str) -> IResult<&'i str, Self>;
}

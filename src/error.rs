use std::borrow::Cow;

/// Any error that may happen while encoding or decoding data, or while
/// reading or writing an object container file
///
/// The broad category of the failure is available through
/// [`kind`](Error::kind); the [`Display`](std::fmt::Display) representation
/// carries the details (offending field, byte count, codec name...).
#[derive(thiserror::Error)]
#[error("{}", inner.message)]
pub struct Error {
	inner: Box<ErrorInner>,
}

struct ErrorInner {
	kind: ErrorKind,
	message: Cow<'static, str>,
}

/// The category of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
	/// Magic bytes mismatch, missing required metadata or malformed metadata
	/// map in an object container file header
	InvalidHeader,
	/// A variable-length integer ran over its maximum width, or its decoded
	/// magnitude does not fit the target integer type
	MalformedVarint,
	/// A length prefix (bytes, string, block...) is negative or otherwise
	/// out of range
	MalformedLength,
	/// The input ended in the middle of an item
	UnexpectedEnd,
	/// The 16 bytes trailing a block do not match the file's sync marker
	SyncMarkerMismatch,
	/// The `avro.codec` metadata names a codec this build does not provide
	UnsupportedCodec,
	/// A compressed block could not be decompressed, or its checksum does
	/// not match
	CodecCorrupt,
	/// The schema JSON is syntactically invalid or structurally illegal
	SchemaParse,
	/// A value cannot be encoded under the schema it was provided with
	SchemaMismatch,
	/// The writer schema cannot be resolved against the reader schema
	SchemaIncompatible,
	/// The writer wrote an enum symbol that the reader schema does not define
	EnumSymbolMissing,
	/// Decoded data is not valid for its schema (bad boolean byte, invalid
	/// UTF-8, out-of-range union branch or enum index...)
	InvalidData,
	/// The writer was used after `close`
	WriterClosed,
	/// An I/O error from the underlying sink or source
	Io,
}

impl Error {
	/// The category of this error
	pub fn kind(&self) -> ErrorKind {
		self.inner.kind
	}

	/// If you need a dynamic string use `Error::msg(kind, format_args!(...))`
	pub(crate) fn new(kind: ErrorKind, message: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				message: Cow::Borrowed(message),
			}),
		}
	}

	pub(crate) fn msg(kind: ErrorKind, message: std::fmt::Arguments<'_>) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				message: Cow::Owned(message.to_string()),
			}),
		}
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		match io_error.kind() {
			std::io::ErrorKind::UnexpectedEof => Self::new(
				ErrorKind::UnexpectedEnd,
				"Unexpected end of input in the middle of an item",
			),
			_ => Self::msg(ErrorKind::Io, format_args!("I/O error: {io_error}")),
		}
	}
}

impl std::fmt::Debug for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}: {}", self.inner.kind, self.inner.message)
	}
}

impl From<crate::schema::SchemaError> for Error {
	fn from(schema_error: crate::schema::SchemaError) -> Self {
		Self::msg(ErrorKind::SchemaParse, format_args!("{schema_error}"))
	}
}

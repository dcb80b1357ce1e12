use std::io::{BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::Deserializer;

use crate::common::{Request, Response};
use crate::{PoolError, Result};

/// A client for [`EchoServer`](crate::EchoServer).
pub struct EchoClient {
    reader: Deserializer<IoRead<TcpStream>>,
    writer: BufWriter<TcpStream>,
}

impl EchoClient {
    /// Connects to the server at the given address.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let reader_stream = TcpStream::connect(addr)?;
        let writer_stream = reader_stream.try_clone()?;
        Ok(Self {
            reader: Deserializer::from_reader(reader_stream),
            writer: BufWriter::new(writer_stream),
        })
    }

    /// Sends `body` and waits for the server's job to echo it back.
    pub fn echo(&mut self, body: String) -> Result<String> {
        let request = Request::Echo { body };
        serde_json::to_writer(&mut self.writer, &request)?;
        self.writer.flush()?;

        match Response::deserialize(&mut self.reader)? {
            Response::Ok(body) => Ok(body),
            Response::Err(msg) => Err(PoolError::StringError(msg)),
        }
    }
}

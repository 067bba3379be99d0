use super::messages::{ClientMessage, ServerMessage};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

/// NDJSON Codec - 處理訊息的序列化與反序列化
///
/// 讀取逾時時尚未讀完的半行會留在 `pending`，下次呼叫接著讀。
pub struct Codec {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    pending: Vec<u8>,
}

impl Codec {
    /// 從 TcpStream 建立 Codec
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        let reader = BufReader::new(stream);
        Ok(Self {
            reader,
            writer,
            pending: Vec::new(),
        })
    }

    /// 讀取一行並解析為 ClientMessage
    ///
    /// - `Ok(None)`: EOF
    /// - `Err(InvalidData)`: 該行不是合法訊息，已被丟棄，連線可以繼續使用
    /// - `Err(WouldBlock | TimedOut)`: 讀取逾時，半行保留
    pub fn read_message(&mut self) -> io::Result<Option<ClientMessage>> {
        loop {
            let bytes_read = self.reader.read_until(b'\n', &mut self.pending)?;
            let complete = self.pending.last() == Some(&b'\n');

            if bytes_read == 0 && !complete {
                // EOF - 連線關閉 (不完整的最後一行直接丟棄)
                return Ok(None);
            }
            if !complete {
                continue;
            }

            let line = std::mem::take(&mut self.pending);
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                // 空行，繼續讀取
                continue;
            }

            return serde_json::from_str(text).map(Some).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("JSON parse error: {}", e))
            });
        }
    }

    /// 發送 ServerMessage
    pub fn send_message(&mut self, msg: &ServerMessage) -> io::Result<()> {
        let json = serde_json::to_string(msg).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON serialize error: {}", e))
        })?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}

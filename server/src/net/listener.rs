use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener};

const DEFAULT_BACKLOG: i32 = 128;

/// 建立遊戲 / 管理介面共用的 TCP listener
///
/// 開啟 SO_REUSEADDR，重啟時不必等 TIME_WAIT 結束。
pub fn create_tcp_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(DEFAULT_BACKLOG)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    #[test]
    fn test_create_listener() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = create_tcp_listener(addr).expect("Failed to create listener");
        let local_addr = listener.local_addr().expect("Failed to get local addr");
        assert!(local_addr.port() > 0);
    }

    #[test]
    fn test_listener_accepts_loopback() {
        let listener = create_tcp_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"hi").unwrap();

        let (mut server_side, _) = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        server_side.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi");
    }
}

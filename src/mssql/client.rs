use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Type alias for a SQL Server client over tokio TCP.
pub(super) type MssqlClient = Client<Compat<TcpStream>>;

/// Open a TCP connection and complete the TDS handshake.
pub(super) async fn connect(config: &Config) -> Result<MssqlClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config.clone(), tcp.compat_write()).await
}

pub mod duplex;
pub mod tunnel;
pub mod version;

use serde::Deserialize;
use webrtc::ice_transport::ice_server::RTCIceServer;

use tunnel_net::relay::RelayClient;
use tunnel_net::{Result, TunnelError};

use crate::cli::Cli;

/// Things every subcommand needs to build a [`RelayClient`] and an ICE
/// server list, pulled out of the persistent flags once.
pub struct SharedConfig {
    pub relay: RelayClient,
    pub headers: Vec<(String, String)>,
    pub ice_servers: Vec<RTCIceServer>,
}

impl SharedConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let dns_server = cli
            .dns_server
            .as_deref()
            .map(|s| {
                s.parse()
                    .map_err(|e| TunnelError::InvalidPeerMessage(format!("bad --dns-server: {e}")))
            })
            .transpose()?;

        let relay = RelayClient::new(&cli.server, cli.insecure, dns_server)?;

        let headers = cli
            .headers
            .iter()
            .map(|h| parse_header(h))
            .collect::<Result<Vec<_>>>()?;

        let ice_servers = parse_ice_servers(cli.ice_servers.as_deref())?;

        Ok(Self {
            relay,
            headers,
            ice_servers,
        })
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
        None => Err(TunnelError::BadHeaderFormat(raw.to_string())),
    }
}

/// A single `urls` entry in `--ice-servers` JSON, accepting either a bare
/// string or an array of strings (`spec.md` §6.1: `urls: string | [string]`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Urls {
    One(String),
    Many(Vec<String>),
}

impl From<Urls> for Vec<String> {
    fn from(urls: Urls) -> Self {
        match urls {
            Urls::One(url) => vec![url],
            Urls::Many(urls) => urls,
        }
    }
}

#[derive(Deserialize)]
struct IceServerInput {
    urls: Urls,
    #[serde(default)]
    username: String,
    #[serde(default)]
    credential: String,
}

impl From<IceServerInput> for RTCIceServer {
    fn from(input: IceServerInput) -> Self {
        RTCIceServer {
            urls: input.urls.into(),
            username: input.username,
            credential: input.credential,
            ..Default::default()
        }
    }
}

/// Parse `--ice-servers` JSON, or fall back to the public STUN server
/// `spec.md` §6.1 names as the default when the flag is omitted.
fn parse_ice_servers(json: Option<&str>) -> Result<Vec<RTCIceServer>> {
    match json {
        Some(json) => {
            let inputs: Vec<IceServerInput> =
                serde_json::from_str(json).map_err(TunnelError::BadIceServersJson)?;
            Ok(inputs.into_iter().map(RTCIceServer::from).collect())
        }
        None => Ok(vec![RTCIceServer {
            urls: vec!["stun:stun.l.google.com:19302".to_string()],
            ..Default::default()
        }]),
    }
}

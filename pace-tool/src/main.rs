use std::ffi::CStr;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{ArgAction, Parser, Subcommand};
use pace_sm::hexdump;
use pace_sm::iso7816::apdu::Apdu;
use pace_sm::iso7816::card::SmartCard;
use pace_sm::iso7816::file::read_binary_sfi;
use pace_sm::pace::{PaceParameters, PacePinId};
use pace_sm::pace::asn1::parse_card_access;
use pace_sm::pace::process::PaceProcess;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;


/// Short file identifier of EF.CardAccess.
const SFI_CARD_ACCESS: u8 = 0x1C;


#[derive(Clone, Debug, Parser)]
#[command(version, about)]
struct Opts {
    /// Increase log output (-v for debug, -vv for trace); RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Clone, Debug, Subcommand)]
enum Mode {
    /// Lists the available PC/SC readers.
    ListReaders,

    /// Establishes PACE and sends one APDU through the secure channel.
    Establish(EstablishOpts),
}

#[derive(Clone, Debug, Parser)]
struct EstablishOpts {
    #[arg(short, long = "reader", default_value = "0")]
    pub reader_index: usize,

    /// The password type: mrz, can, pin or puk.
    #[arg(long, default_value = "can")]
    pub pin_id: PacePinId,

    #[arg(short, long)]
    pub password: String,

    /// Certificate Holder Authorization Template as hex, without its 7F4C tag.
    #[arg(long)]
    pub chat: Option<HexBytes>,

    /// Certificate description as hex, without its 73 tag.
    #[arg(long)]
    pub cert_desc: Option<HexBytes>,

    /// The plain command APDU to send once the channel is established, as hex. Defaults to
    /// reading EF.CardAccess again.
    #[arg(long, default_value = "00B09C0000")]
    pub apdu: HexBytes,
}


/// Bytes given on the command line as hex digits; whitespace is ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct HexBytes(Vec<u8>);
impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(Self(hex::decode(digits)?))
    }
}


fn setup_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}


fn establish(ctx: &pcsc::Context, reader: &CStr, opts: EstablishOpts) -> Result<(), Box<dyn std::error::Error>> {
    let mut card = ctx.connect(reader, pcsc::ShareMode::Shared, pcsc::Protocols::ANY)?;

    let card_access = read_binary_sfi(&mut card, SFI_CARD_ACCESS)?;
    info!("EF.CardAccess:\n{}", hexdump(&card_access));

    let pace_infos = parse_card_access(&card_access)?;
    let Some(pace_info) = pace_infos.into_iter().next() else {
        return Err("EF.CardAccess lists no supported PACE protocol".into());
    };

    let mut parameters = PaceParameters::new(opts.pin_id, &opts.password);
    parameters.chat = opts.chat.map(|HexBytes(chat)| chat);
    parameters.certificate_description = opts.cert_desc.map(|HexBytes(cert_desc)| cert_desc);

    let process = PaceProcess::new(parameters, pace_info);
    let result = match process.execute(&mut card) {
        Ok(result) => result,
        Err(e) => {
            error!("PACE failed with result code {}", e.result_code());
            return Err(e.into());
        },
    };
    info!("PACE established ({:?})", result.mse_status);
    info!("ID_ICC:\n{}", hexdump(&result.id_icc));
    if let Some(car) = &result.current_car {
        info!("current CAR: {}", String::from_utf8_lossy(car));
    }
    if let Some(car) = &result.previous_car {
        info!("previous CAR: {}", String::from_utf8_lossy(car));
    }

    let mut secure_card = result.into_secure_card(card)?;
    let request = Apdu::from_slice(&opts.apdu.0)
        .ok_or("the APDU is not a valid command APDU")?;
    let response = secure_card.communicate(&request)?;
    println!("{}", response.status());
    if !response.data.is_empty() {
        print!("{}", hexdump(&response.data));
    }
    Ok(())
}


fn main() -> ExitCode {
    let opts = Opts::parse();
    setup_tracing(opts.verbose);

    let ctx = pcsc::Context::establish(pcsc::Scope::User)
        .expect("failed to establish PC/SC user context");

    let readers_buf_len = ctx.list_readers_len()
        .expect("failed to obtain length of buffer for PC/SC reader list");
    let mut readers_buf = vec![0u8; readers_buf_len];
    let mut readers = ctx.list_readers(&mut readers_buf)
        .expect("failed to list PC/SC readers");

    match opts.mode {
        Mode::ListReaders => {
            for (i, reader) in readers.enumerate() {
                println!("{}: {:?}", i, reader);
            }
            ExitCode::SUCCESS
        },
        Mode::Establish(establish_opts) => {
            let Some(reader) = readers.nth(establish_opts.reader_index) else {
                error!("no reader at index {}", establish_opts.reader_index);
                return ExitCode::FAILURE;
            };
            match establish(&ctx, reader, establish_opts) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                },
            }
        },
    }
}

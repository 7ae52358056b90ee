use hex_literal::hex;
use pace_sm::crypt::boxed_uint_from_be_slice;
use pace_sm::iso7816::apdu::{Apdu, Response, ResponseTrailer};
use pace_sm::iso7816::card::{CommunicationError, SmartCard};
use pace_sm::pace::{Error, MseStatus, PaceParameters, PacePinId, PaceResultCode, Step};
use pace_sm::pace::asn1::parse_card_access;
use pace_sm::pace::process::{PaceProcess, ProcessResult};


/// A fake smart card that acts exactly like the card in ICAO Doc 9303 Part 11 Appendix G.1,
/// followed by the first two Secure Messaging exchanges of Appendix D.
///
/// If any of its expectations are not met, it responds with 0x69 0x88.
struct AppendixG1Card {
    state: u8,
    mse_payload: Vec<u8>,
    mutual_response: Response,
}
impl AppendixG1Card {
    const CARD_ACCESS: [u8; 22] = hex!("31143012060A04007F0007020204020202010202010D");
    const EXPECTED_MSE_SET_AT_PAYLOAD: [u8; 15] = hex!("80 0A 04 00 7F 00 07 02 02 04 02 02 83 01 01");
    const EXPECTED_GA_INITIAL_PAYLOAD: [u8; 2] = hex!("7C 00");
    const GA_INITIAL_RESPONSE: [u8; 20] = hex!("7C 12 80 10 95 A3 A0 16 52 2E E9 8D 01 E7 6C B6 B9 8B 42 C3");
    const EXPECTED_GA_MAPPING_PAYLOAD: [u8; 69] = hex!("
        7C 43 81 41 04 7A CF 3E FC 98 2E C4 55 65 A4 B1 55
        12 9E FB C7 46 50 DC BF A6 36 2D 89 6F C7 02 62 E0 C2 CC 5E 54 45
        52 DC B6 72 52 18 79 91 15 B5 5C 9B AA 6D 9F 6B C3 A9 61 8E 70 C2
        5A F7 17 77 A9 C4 92 2D
    ");
    const GA_MAPPING_RESPONSE: [u8; 69] = hex!("
        7C 43 82 41 04 82 4F BA 91 C9 CB E2 6B EF 53 A0 EB E7 34 2A 3B F1
        78 CE A9 F4 5D E0 B7 0A A6 01 65 1F BA 3F 57 30 D8 C8 79 AA A9 C9
        F7 39 91 E6 1B 58 F4 D5 2E B8 7A 0A 0C 70 9A 49 DC 63 71 93 63 CC
        D1 3C 54
    ");
    const EXPECTED_GA_AGREEMENT_PAYLOAD: [u8; 69] = hex!("
        7C 43 83 41 04 2D B7 A6 4C 03 55 04 4E C9 DF 19
        05 14 C6 25 CB A2 CE A4 87 54 88 71 22 F3 A5 EF 0D 5E DD 30 1C
        35 56 F3 B3 B1 86 DF 10 B8 57 B5 8F 6A 7E B8 0F 20 BA 5D C7 BE
        1D 43 D9 BF 85 01 49 FB B3 64 62
    ");
    const GA_AGREEMENT_RESPONSE: [u8; 69] = hex!("
        7C 43 84 41 04 9E 88 0F 84 29 05 B8 B3 18 1F 7A F7 CA A9 F0 EF
        B7 43 84 7F 44 A3 06 D2 D2 8C 1D 9E C6 5D F6 DB 77 64 B2 22 77
        A2 ED DC 3C 26 5A 9F 01 8F 9C B8 52 E1 11 B7 68 B3 26 90 4B 59
        A0 19 37 76 F0 94
    ");
    const EXPECTED_GA_MUTUAL_PAYLOAD: [u8; 12] = hex!("7C 0A 85 08 C2 B0 BD 78 D9 4B A8 66");
    const GA_MUTUAL_RESPONSE: [u8; 12] = hex!("7C 0A 86 08 3A BB 96 74 BC E9 3C 08");

    const EXPECTED_SM_SELECT: [u8; 35] = hex!("0CA4020C1D8711010BBA9E26C278696F47774F010F3D75BE8E0859E8A937351A041200");
    const SM_SELECT_RESPONSE: [u8; 16] = hex!("990290008E08BEA7B381C494A0799000");
    const EXPECTED_SM_READ_BINARY: [u8; 22] = hex!("0CB0000000000D9701048E08AA6BA54F44DF83640000");
    const SM_READ_BINARY_RESPONSE: [u8; 35] = hex!("871101AD2D34A61B89244D3595BF0FE41C935E990290008E08A98E8C797E2A0BC99000");

    pub fn new() -> Self {
        Self::with_mutual_response(Self::GA_MUTUAL_RESPONSE.to_vec())
    }

    pub fn with_mutual_response(mutual_response: Vec<u8>) -> Self {
        Self {
            state: 0,
            mse_payload: Self::EXPECTED_MSE_SET_AT_PAYLOAD.to_vec(),
            mutual_response: Self::success(&mutual_response),
        }
    }

    /// Fails the mutual authentication with the given status word.
    pub fn with_mutual_status(sw: u16) -> Self {
        let mut card = Self::new();
        card.mutual_response = Response {
            data: Vec::new(),
            trailer: ResponseTrailer::from_word(sw),
        };
        card
    }

    /// Expects the CHAT in MSE:Set AT and answers the mutual authentication with `mutual_response`.
    pub fn with_chat(chat: &[u8], mutual_response: Vec<u8>) -> Self {
        let mut card = Self::with_mutual_response(mutual_response);
        card.mse_payload.extend_from_slice(&hex!("7F4C"));
        card.mse_payload.push(chat.len().try_into().unwrap());
        card.mse_payload.extend_from_slice(chat);
        card
    }

    fn success(data: &[u8]) -> Response {
        Response {
            data: data.to_vec(),
            trailer: ResponseTrailer::new(0x90, 0x00),
        }
    }
}
impl SmartCard for AppendixG1Card {
    fn communicate(&mut self, request: &Apdu) -> Result<Response, CommunicationError> {
        println!("AppendixG1Card received: {:#?}", request);
        let header = request.header.to_bytes();
        if self.state == 0
                && header == hex!("00 22 C1 A4")
                && request.data.request_data() == Some(&self.mse_payload[..])
                && request.data.response_data_length().is_none() {
            self.state = 1;
            Ok(Self::success(&[]))
        } else if self.state == 1
                && header == hex!("10 86 00 00")
                && request.data.request_data() == Some(&Self::EXPECTED_GA_INITIAL_PAYLOAD)
                && request.data.response_data_length() == Some(0x100) {
            self.state = 2;
            Ok(Self::success(&Self::GA_INITIAL_RESPONSE))
        } else if self.state == 2
                && header == hex!("10 86 00 00")
                && request.data.request_data() == Some(&Self::EXPECTED_GA_MAPPING_PAYLOAD)
                && request.data.response_data_length() == Some(0x100) {
            self.state = 3;
            Ok(Self::success(&Self::GA_MAPPING_RESPONSE))
        } else if self.state == 3
                && header == hex!("10 86 00 00")
                && request.data.request_data() == Some(&Self::EXPECTED_GA_AGREEMENT_PAYLOAD)
                && request.data.response_data_length() == Some(0x100) {
            self.state = 4;
            Ok(Self::success(&Self::GA_AGREEMENT_RESPONSE))
        } else if self.state == 4
                && header == hex!("00 86 00 00") // no more chaining
                && request.data.request_data() == Some(&Self::EXPECTED_GA_MUTUAL_PAYLOAD)
                && request.data.response_data_length() == Some(0x100) {
            self.state = 5;
            Ok(self.mutual_response.clone())
        } else if self.state == 5
                && request.to_bytes()? == Self::EXPECTED_SM_SELECT {
            self.state = 6;
            Response::from_slice(&Self::SM_SELECT_RESPONSE).ok_or(CommunicationError::ShortResponse)
        } else if self.state == 6
                && request.to_bytes()? == Self::EXPECTED_SM_READ_BINARY {
            self.state = 7;
            Response::from_slice(&Self::SM_READ_BINARY_RESPONSE).ok_or(CommunicationError::ShortResponse)
        } else {
            // IDFK
            Ok(Response {
                data: Vec::with_capacity(0),
                trailer: ResponseTrailer::new(0x69, 0x88),
            })
        }
    }
}


const MRZ_DATA: &str = "T22000129364081251010318";
const MAPPING_PRIVATE_KEY: [u8; 32] = hex!("
    7F4EF07B 9EA82FD7 8AD689B3 8D0BC78C
    F21F249D 953BC46F 4C6E1925 9C010F99
");
const AGREEMENT_PRIVATE_KEY: [u8; 32] = hex!("
    A73FB703 AC1436A1 8E0CFA5A BB3F7BEC
    7A070E7A 6788486B EE230C4A 22762595
");


const CHAT: [u8; 18] = hex!("060904007F00070301020253050000000004");


fn appendix_g1_process() -> PaceProcess {
    appendix_g1_process_with(PaceParameters::new(PacePinId::Mrz, MRZ_DATA))
}

fn appendix_g1_process_with(parameters: PaceParameters) -> PaceProcess {
    let mut pace_infos = parse_card_access(&AppendixG1Card::CARD_ACCESS)
        .expect("failed to decode EF.CardAccess");
    assert_eq!(pace_infos.len(), 1);
    PaceProcess::new(parameters, pace_infos.remove(0))
}

fn run_appendix_g1(process: &PaceProcess, card: &mut AppendixG1Card) -> Result<ProcessResult, Error> {
    process.execute_with_private_keys(
        card,
        boxed_uint_from_be_slice(&MAPPING_PRIVATE_KEY),
        boxed_uint_from_be_slice(&AGREEMENT_PRIVATE_KEY),
    )
}


#[test]
fn test_pace_setup_appg1() {
    let mut card = AppendixG1Card::new();

    let result = appendix_g1_process()
        .execute_with_private_keys(
            &mut card,
            boxed_uint_from_be_slice(&MAPPING_PRIVATE_KEY),
            boxed_uint_from_be_slice(&AGREEMENT_PRIVATE_KEY),
        )
        .expect("failed to establish PACE");

    assert_eq!(result.mse_status, MseStatus::Success);
    assert_eq!(result.enc_key.as_slice(), &hex!("F5F0E35C 0D7161EE 6724EE51 3A0D9A7F"));
    assert_eq!(result.mac_key.as_slice(), &hex!("FE251C78 58B356B2 4514B3BD 5F4297D1"));
    assert_eq!(result.current_car, None);
    assert_eq!(result.previous_car, None);
    assert_eq!(
        result.id_icc,
        hex!("02 9E880F84 2905B8B3 181F7AF7 CAA9F0EF B743847F 44A306D2 D28C1D9E C65DF6DB"),
    );

    // the session keys now protect the channel
    let mut secure_card = result.into_secure_card(card)
        .expect("failed to set up Secure Messaging");

    let select = Apdu::from_slice(&hex!("00A4020C02011C")).unwrap();
    let response = secure_card.communicate(&select).expect("SELECT failed");
    assert!(response.is_success());
    assert!(response.data.is_empty());

    let read_binary = Apdu::from_slice(&hex!("00B0000004")).unwrap();
    let response = secure_card.communicate(&read_binary).expect("READ BINARY failed");
    assert!(response.is_success());
    assert_eq!(response.data, hex!("31143012"));

    assert_eq!(secure_card.into_inner().state, 7);
}


#[test]
fn test_pace_wrong_token_appg1() {
    let mut card = AppendixG1Card::with_mutual_response(hex!("7C 0A 86 08 3A BB 96 74 BC E9 3C 09").to_vec());

    let error = appendix_g1_process()
        .execute_with_private_keys(
            &mut card,
            boxed_uint_from_be_slice(&MAPPING_PRIVATE_KEY),
            boxed_uint_from_be_slice(&AGREEMENT_PRIVATE_KEY),
        )
        .unwrap_err();
    assert!(matches!(error, Error::MutualAuthentication));
    assert_eq!(error.result_code(), PaceResultCode::WrongAuthToken);
}


#[test]
fn test_pace_wrong_password_appg1() {
    // a different MRZ decrypts a different nonce, so the mapped generator and with it the
    // ephemeral public key differ; the card answers 6988 to GA 3
    let mut card = AppendixG1Card::new();
    let pace_infos = parse_card_access(&AppendixG1Card::CARD_ACCESS).unwrap();
    let process = PaceProcess::new(
        PaceParameters::new(PacePinId::Mrz, "T22000129364081251010319"),
        pace_infos[0].clone(),
    );

    let error = process
        .execute_with_private_keys(
            &mut card,
            boxed_uint_from_be_slice(&MAPPING_PRIVATE_KEY),
            boxed_uint_from_be_slice(&AGREEMENT_PRIVATE_KEY),
        )
        .unwrap_err();
    assert_eq!(error.result_code().code(), 0xF005_6988);
}


#[test]
fn test_pace_with_chat_appg1() {
    let mut card = AppendixG1Card::with_chat(
        &CHAT,
        hex!("7C1C 86083ABB9674BCE93C08 87084445435643413031 8806444543564341").to_vec(),
    );
    let process = appendix_g1_process_with(
        PaceParameters::new(PacePinId::Mrz, MRZ_DATA).with_chat(CHAT.to_vec()),
    );

    let result = run_appendix_g1(&process, &mut card)
        .expect("failed to establish PACE");
    assert_eq!(card.state, 5);
    assert_eq!(result.enc_key.as_slice(), &hex!("F5F0E35C 0D7161EE 6724EE51 3A0D9A7F"));
    assert_eq!(result.current_car.as_deref(), Some(&b"DECVCA01"[..]));
    assert_eq!(result.previous_car.as_deref(), Some(&b"DECVCA"[..]));
}


#[test]
fn test_pace_with_chat_requires_car_appg1() {
    let mut card = AppendixG1Card::with_chat(&CHAT, AppendixG1Card::GA_MUTUAL_RESPONSE.to_vec());
    let process = appendix_g1_process_with(
        PaceParameters::new(PacePinId::Mrz, MRZ_DATA).with_chat(CHAT.to_vec()),
    );

    let error = run_appendix_g1(&process, &mut card).unwrap_err();
    assert!(matches!(error, Error::MissingObject { step: Step::MutualAuthentication, tag: 0x87 }));
    assert_eq!(error.result_code(), PaceResultCode::UnexpectedTlvResponseObject);
}


#[test]
fn test_pace_password_status_appg1() {
    let process = appendix_g1_process();

    let mut card = AppendixG1Card::with_mutual_status(0x63C2);
    let error = run_appendix_g1(&process, &mut card).unwrap_err();
    assert!(matches!(error, Error::WrongPassword { step: Step::MutualAuthentication, remaining: 2 }));
    assert_eq!(error.result_code().code(), 0xF006_63C2);

    let mut card = AppendixG1Card::with_mutual_status(0x63C1);
    let error = run_appendix_g1(&process, &mut card).unwrap_err();
    assert!(matches!(error, Error::PinSuspended { step: Step::MutualAuthentication }));

    let mut card = AppendixG1Card::with_mutual_status(0x63C0);
    let error = run_appendix_g1(&process, &mut card).unwrap_err();
    assert!(matches!(error, Error::PinBlocked { step: Step::MutualAuthentication }));
    assert_eq!(error.result_code().code(), 0xF006_63C0);

    let mut card = AppendixG1Card::with_mutual_status(0x6300);
    let error = run_appendix_g1(&process, &mut card).unwrap_err();
    assert_eq!(error.result_code(), PaceResultCode::Ga4Error(0x6300));
}

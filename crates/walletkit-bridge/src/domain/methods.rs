//! Engine method names.
//!
//! The engine exposes one dispatch entrypoint; these are the method names the
//! bridge itself issues through it. Arbitrary other methods can still be
//! called through [`crate::WalletKitBridge::call`].

/// One-time engine setup. Payload: the `WalletKitConfig`.
pub const INIT: &str = "init";

pub const APPROVE_CONNECT_REQUEST: &str = "approveConnectRequest";
pub const REJECT_CONNECT_REQUEST: &str = "rejectConnectRequest";
pub const APPROVE_TRANSACTION_REQUEST: &str = "approveTransactionRequest";
pub const REJECT_TRANSACTION_REQUEST: &str = "rejectTransactionRequest";
pub const APPROVE_SIGN_DATA_REQUEST: &str = "approveSignDataRequest";
pub const REJECT_SIGN_DATA_REQUEST: &str = "rejectSignDataRequest";

pub const HANDLE_TON_CONNECT_URL: &str = "handleTonConnectUrl";
pub const LIST_SESSIONS: &str = "listSessions";
pub const DISCONNECT_SESSION: &str = "disconnect";
pub const GET_WALLETS: &str = "getWallets";

/// Approve/reject method pair for one request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMethods {
    pub approve: &'static str,
    pub reject: &'static str,
}

pub const CONNECT: ResponseMethods = ResponseMethods {
    approve: APPROVE_CONNECT_REQUEST,
    reject: REJECT_CONNECT_REQUEST,
};

pub const TRANSACTION: ResponseMethods = ResponseMethods {
    approve: APPROVE_TRANSACTION_REQUEST,
    reject: REJECT_TRANSACTION_REQUEST,
};

pub const SIGN_DATA: ResponseMethods = ResponseMethods {
    approve: APPROVE_SIGN_DATA_REQUEST,
    reject: REJECT_SIGN_DATA_REQUEST,
};

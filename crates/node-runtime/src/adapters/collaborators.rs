//! Placeholders for the payment and NAT tracking collaborators. They carry
//! no behaviour of their own; session managers only pass them along.

use shared_types::ports::{
    BlockchainHelper, IdentityRegistry, InvoiceStorage, NatTracker, PromiseStorage, Transactor,
};

#[derive(Debug, Default)]
pub struct NoopIdentityRegistry;

impl IdentityRegistry for NoopIdentityRegistry {}

#[derive(Debug, Default)]
pub struct NoopTransactor;

impl Transactor for NoopTransactor {}

#[derive(Debug, Default)]
pub struct NoopBlockchainHelper;

impl BlockchainHelper for NoopBlockchainHelper {}

#[derive(Debug, Default)]
pub struct NoopPromiseStorage;

impl PromiseStorage for NoopPromiseStorage {}

#[derive(Debug, Default)]
pub struct NoopInvoiceStorage;

impl InvoiceStorage for NoopInvoiceStorage {}

#[derive(Debug, Default)]
pub struct NoopNatTracker;

impl NatTracker for NoopNatTracker {}

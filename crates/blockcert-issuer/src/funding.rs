//! Moving value from long-term storage to the issuing address.
//!
//! Each certificate spends one output of the issuing address, so the
//! address needs one suitably sized output per certificate. They are made by
//! splitting a storage payment across temporary wallet addresses and
//! forwarding each of those to the issuing address separately.

use rand::seq::SliceRandom;

use crate::amount::FeeSchedule;
use crate::backend::{FundingService, LedgerBackend};
use crate::confirmation::ConfirmationWaiter;
use crate::IssuerError;

/// Label given to the `i`th temporary wallet address.
pub fn temporary_label(index: usize) -> String {
    format!("temp-address-{}", index)
}

/// What a funding run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FundingSummary {
    /// Temporary addresses created and archived, in creation order.
    pub temporary_addresses: Vec<String>,
    /// Total sent from storage to the temporary addresses.
    pub allocated: u64,
    /// Total forwarded to the issuing address.
    pub forwarded: u64,
    /// Fees paid by the split and the forwarding payments.
    pub fees: u64,
}

/// Runs the storage → temporary → issuing transfer sequence.
pub struct FundAllocator<'a> {
    funding: &'a dyn FundingService,
    waiter: &'a ConfirmationWaiter,
    fees: FeeSchedule,
    storage_address: &'a str,
    issuing_address: &'a str,
}

impl<'a> FundAllocator<'a> {
    pub fn new(
        funding: &'a dyn FundingService,
        waiter: &'a ConfirmationWaiter,
        fees: FeeSchedule,
        storage_address: &'a str,
        issuing_address: &'a str,
    ) -> Self {
        FundAllocator {
            funding,
            waiter,
            fees,
            storage_address,
            issuing_address,
        }
    }

    /// Fund the issuing address for `count` certificates.
    ///
    /// 1. log in with `api_key`
    /// 2. wait for the storage address to have nothing pending
    /// 3. create `count` temporary addresses
    /// 4. pay each one `2·dust + 2·fee` in one transfer, then wait on one
    ///    randomly chosen temporary address
    /// 5. forward `2·dust + fee` from each to the issuing address and archive it
    /// 6. wait for the issuing address to confirm
    ///
    /// Confirmation of the sampled address is taken to mean the whole
    /// split transfer confirmed. Nothing is rolled back on failure.
    ///
    /// # Returns
    /// A summary of the transfers; a zero `count` does nothing.
    pub fn allocate(&self, api_key: &str, count: usize) -> Result<FundingSummary, IssuerError> {
        if count == 0 {
            tracing::info!("no certificates to fund");
            return Ok(FundingSummary::default());
        }

        let allocation = self.fees.temporary_allocation()?;
        let forward = self.fees.forward_amount()?;
        let split_fee = self.fees.batch_fee(1, count)?;

        self.funding.login(api_key)?;
        self.waiter.wait(self.funding, self.storage_address)?;

        tracing::info!(count, "creating temporary addresses");
        let mut recipients = Vec::with_capacity(count);
        for i in 0..count {
            let address = self.funding.new_address(&temporary_label(i))?;
            recipients.push((address, allocation));
        }

        tracing::info!(count, allocation, fee = split_fee, "transferring to temporary addresses");
        let reference = self
            .funding
            .send_many(self.storage_address, &recipients, split_fee)?;
        tracing::info!(reference = %reference, "split transfer sent");

        let temporary_addresses: Vec<String> = recipients.into_iter().map(|(a, _)| a).collect();
        if let Some(sampled) = temporary_addresses.choose(&mut rand::thread_rng()) {
            self.waiter.wait(self.funding, sampled)?;
        }

        for address in &temporary_addresses {
            let reference =
                self.funding
                    .pay(address, self.issuing_address, forward, self.fees.fee)?;
            tracing::info!(from = %address, reference = %reference, amount = forward, "forwarded to issuing address");
            self.funding.archive(address)?;
        }
        self.waiter.wait(self.funding, self.issuing_address)?;

        let count = count as u64;
        Ok(FundingSummary {
            temporary_addresses,
            allocated: allocation.saturating_mul(count),
            forwarded: forward.saturating_mul(count),
            fees: split_fee.saturating_add(self.fees.fee.saturating_mul(count)),
        })
    }
}

/// Check that the issuing address already holds enough for `count`
/// certificates when funding is skipped.
///
/// # Returns
/// The confirmed balance, or `InsufficientFunds` naming the shortfall.
pub fn ensure_issuing_balance(
    backend: &dyn LedgerBackend,
    issuing_address: &str,
    fees: &FeeSchedule,
    count: usize,
) -> Result<u64, IssuerError> {
    let required = fees.batch_cost(count)?;
    let available = backend.confirmed_balance(issuing_address)?;
    if available < required {
        tracing::error!(
            address = issuing_address,
            shortfall = required - available,
            "issuing address needs more funds"
        );
        return Err(IssuerError::InsufficientFunds {
            required,
            available,
        });
    }
    tracing::info!(address = issuing_address, available, required, "issuing balance sufficient");
    Ok(available)
}

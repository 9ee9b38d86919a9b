//! In-memory wallet + contract used by unit tests.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolCall, SolValue};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::contract::ICryptoDevs;
use crate::rpc::{TransactionReceipt, TransactionRequest};
use crate::wallet::{ChainFuture, WalletProvider};

pub(crate) struct MockChain {
    pub chain_id: u64,
    pub accounts: Vec<Address>,
    pub presale_started: bool,
    pub presale_end: U256,
    pub owner: Address,
    pub token_ids: u64,
    pub fail_reads: bool,
    pub truncate_returns: bool,
    pub reject_sends: bool,
    pub revert_sends: bool,
    pub mine: bool,
    pub sent: Vec<TransactionRequest>,
    receipts: HashMap<B256, TransactionReceipt>,
    next_hash: u8,
}

pub(crate) struct MockWallet {
    chain: Mutex<MockChain>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockWallet {
    pub const ACCOUNT: Address = Address::repeat_byte(0xaa);
    pub const OWNER: Address = Address::repeat_byte(0x0e);
    pub const CONTRACT: Address = Address::repeat_byte(0xcd);
    pub const DEPLOYED: Address = Address::repeat_byte(0xde);

    pub fn new() -> Self {
        Self {
            chain: Mutex::new(MockChain {
                chain_id: 5,
                accounts: vec![Self::ACCOUNT],
                presale_started: false,
                presale_end: U256::ZERO,
                owner: Self::OWNER,
                token_ids: 0,
                fail_reads: false,
                truncate_returns: false,
                reject_sends: false,
                revert_sends: false,
                mine: true,
                sent: Vec::new(),
                receipts: HashMap::new(),
                next_hash: 1,
            }),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_chain<R>(&self, f: impl FnOnce(&mut MockChain) -> R) -> R {
        f(&mut self.chain.lock().unwrap())
    }

    pub fn set_chain_id(&self, id: u64) {
        self.with_chain(|c| c.chain_id = id);
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.with_chain(|c| c.accounts = accounts);
    }

    pub fn set_mine_transactions(&self, mine: bool) {
        self.with_chain(|c| c.mine = mine);
    }

    /// Number of times `name` was invoked: an RPC method or a contract function.
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn count(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_default() += 1;
    }

    fn answer_call(&self, data: &[u8]) -> Result<Bytes, crate::Error> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| crate::Error::Rpc("calldata too short".into()))?;
        let chain = self.chain.lock().unwrap();
        if chain.fail_reads {
            return Err(crate::Error::Rpc("connection refused".into()));
        }
        let (name, encoded) = if selector == ICryptoDevs::presaleStartedCall::SELECTOR {
            ("presaleStarted", chain.presale_started.abi_encode())
        } else if selector == ICryptoDevs::presaleEndedCall::SELECTOR {
            ("presaleEnded", chain.presale_end.abi_encode())
        } else if selector == ICryptoDevs::ownerCall::SELECTOR {
            ("owner", chain.owner.abi_encode())
        } else if selector == ICryptoDevs::tokenIdsCall::SELECTOR {
            ("tokenIds", U256::from(chain.token_ids).abi_encode())
        } else {
            return Err(crate::Error::Rpc("execution reverted".into()));
        };
        drop(chain);
        self.count(name);
        let encoded = if self.with_chain(|c| c.truncate_returns) {
            encoded[..16].to_vec()
        } else {
            encoded
        };
        Ok(encoded.into())
    }

    fn accept_transaction(&self, tx: TransactionRequest) -> Result<B256, crate::Error> {
        let mut chain = self.chain.lock().unwrap();
        if chain.reject_sends {
            return Err(crate::Error::Rejected("User denied transaction signature".into()));
        }
        let selector = tx.data.get(..4).unwrap_or_default();
        if !chain.revert_sends {
            if selector == ICryptoDevs::startPresaleCall::SELECTOR {
                chain.presale_started = true;
            } else if selector == ICryptoDevs::mintCall::SELECTOR
                || selector == ICryptoDevs::presaleMintCall::SELECTOR
            {
                chain.token_ids += 1;
            }
        }
        let hash = B256::repeat_byte(chain.next_hash);
        chain.next_hash = chain.next_hash.wrapping_add(1);
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(chain.next_hash)),
            status: Some(if chain.revert_sends { U64::ZERO } else { U64::from(1) }),
            contract_address: tx.to.is_none().then_some(Self::DEPLOYED),
        };
        chain.receipts.insert(hash, receipt);
        chain.sent.push(tx);
        Ok(hash)
    }
}

impl WalletProvider for MockWallet {
    fn chain_id(&self) -> ChainFuture<'_, u64> {
        Box::pin(async move {
            self.count("eth_chainId");
            Ok(self.with_chain(|c| c.chain_id))
        })
    }

    fn accounts(&self) -> ChainFuture<'_, Vec<Address>> {
        Box::pin(async move {
            self.count("eth_accounts");
            Ok(self.with_chain(|c| c.accounts.clone()))
        })
    }

    fn call(&self, _to: Address, data: Bytes) -> ChainFuture<'_, Bytes> {
        Box::pin(async move {
            self.count("eth_call");
            self.answer_call(&data)
        })
    }

    fn send_transaction(&self, tx: TransactionRequest) -> ChainFuture<'_, B256> {
        Box::pin(async move {
            self.count("eth_sendTransaction");
            self.accept_transaction(tx)
        })
    }

    fn transaction_receipt(&self, hash: B256) -> ChainFuture<'_, Option<TransactionReceipt>> {
        Box::pin(async move {
            self.count("eth_getTransactionReceipt");
            Ok(self.with_chain(|c| {
                if c.mine {
                    c.receipts.get(&hash).cloned()
                } else {
                    None
                }
            }))
        })
    }
}

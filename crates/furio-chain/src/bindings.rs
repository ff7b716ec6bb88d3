//! Contract bindings for the vault and pool.

use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use furio_executor::{ContractCall, Function, Target};

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IFurioVault {
        function compound() external returns (bool);
        function claimToFurpool(uint256 amount) external returns (bool);
        function participantBalance(address participant) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IFurioPool {
        function compound() external;
        function claimRewards() external;
        function stakingAmountInUsdc(address participant) external view returns (uint256);
        function getRemainingLockedTime(address participant) external view returns (uint256);
    }
}

/// ABI-encoded calldata for `call`, or `None` if the target lacks the function.
pub(crate) fn encode_call(call: &ContractCall) -> Option<Bytes> {
    let data = match (call.target, call.function) {
        (Target::Vault, Function::Compound) => IFurioVault::compoundCall {}.abi_encode(),
        (Target::Vault, Function::ClaimToPool { amount }) => IFurioVault::claimToFurpoolCall {
            amount: U256::from(amount),
        }
        .abi_encode(),
        (Target::Pool, Function::Compound) => IFurioPool::compoundCall {}.abi_encode(),
        (Target::Pool, Function::ClaimRewards) => IFurioPool::claimRewardsCall {}.abi_encode(),
        _ => return None,
    };
    Some(data.into())
}

//! Universal Deployer Contract call building.

use starknet::core::crypto::pedersen_hash;
use starknet::core::types::{Call, Felt};
use starknet::core::utils::get_contract_address;
use starknet::macros::{felt, selector};

pub const UDC_ADDRESS: Felt =
    felt!("0x041a78e741e5af2fec34b695679bc6891742439f7afb8484ecd7766661ad02bf");
const UDC_DEPLOY_SELECTOR: Felt = selector!("deployContract");

/// Builds the `deployContract` call and the address the contract will land at.
///
/// With `unique`, the UDC mixes the deployer address into the salt and deploys from its
/// own address, so two accounts using the same salt get different contracts.
pub fn deploy_call(
    class_hash: Felt,
    salt: Felt,
    unique: bool,
    constructor_calldata: &[Felt],
    deployer_address: Felt,
) -> (Felt, Call) {
    let calldata = [
        vec![
            class_hash,
            salt,
            if unique { Felt::ONE } else { Felt::ZERO },
            Felt::from(constructor_calldata.len()),
        ],
        constructor_calldata.to_vec(),
    ]
    .concat();

    let contract_address = if unique {
        get_contract_address(
            pedersen_hash(&deployer_address, &salt),
            class_hash,
            constructor_calldata,
            UDC_ADDRESS,
        )
    } else {
        get_contract_address(salt, class_hash, constructor_calldata, Felt::ZERO)
    };

    (
        contract_address,
        Call {
            to: UDC_ADDRESS,
            selector: UDC_DEPLOY_SELECTOR,
            calldata,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calldata_layout() {
        let class_hash = Felt::from(0x1234_u64);
        let salt = Felt::from(7_u64);
        let ctor = [Felt::from(1_u64), Felt::from(2_u64)];

        let (_, call) = deploy_call(class_hash, salt, false, &ctor, Felt::from(0x99_u64));

        assert_eq!(call.to, UDC_ADDRESS);
        assert_eq!(call.selector, UDC_DEPLOY_SELECTOR);
        assert_eq!(
            call.calldata,
            vec![class_hash, salt, Felt::ZERO, Felt::from(2_u64), ctor[0], ctor[1]]
        );
    }

    #[test]
    fn test_unique_address_depends_on_deployer() {
        let class_hash = Felt::from(0x1234_u64);
        let salt = Felt::from(7_u64);

        let (a, _) = deploy_call(class_hash, salt, true, &[], Felt::from(1_u64));
        let (b, _) = deploy_call(class_hash, salt, true, &[], Felt::from(2_u64));
        assert_ne!(a, b);

        let (c, _) = deploy_call(class_hash, salt, false, &[], Felt::from(1_u64));
        let (d, _) = deploy_call(class_hash, salt, false, &[], Felt::from(2_u64));
        assert_eq!(c, d);
    }
}

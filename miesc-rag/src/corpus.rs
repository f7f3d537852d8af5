//! The built-in vulnerability knowledge base: one document per well-known
//! weakness class, covering the SWC registry majors plus common DeFi-specific
//! patterns not captured by SWC. Loaded once at startup into whichever
//! [`VectorStore`](crate::vector_store::VectorStore) the caller configures.

use crate::types::VulnerabilityDocument;

fn doc(
    id: &str,
    title: &str,
    taxonomy_ids: &[&str],
    summary: &str,
    detail: &str,
    remediation: &str,
    tags: &[&str],
) -> VulnerabilityDocument {
    VulnerabilityDocument {
        id: id.to_string(),
        title: title.to_string(),
        taxonomy_ids: taxonomy_ids.iter().map(|s| (*s).to_string()).collect(),
        summary: summary.to_string(),
        detail: detail.to_string(),
        remediation: remediation.to_string(),
        tags: tags.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Returns the built-in knowledge base corpus.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn builtin_corpus() -> Vec<VulnerabilityDocument> {
    vec![
        doc(
            "swc-100",
            "Function Default Visibility",
            &["SWC-100"],
            "Functions without an explicit visibility modifier default to public, exposing internal logic.",
            "Solidity versions before 0.5.0 default unmarked function visibility to `public`, so a function meant to be internal helper logic is callable by any external account or contract. This commonly surfaces in refactors where a function's modifier list is edited but the visibility keyword is dropped.",
            "Always declare an explicit visibility (`external`, `public`, `internal`, `private`) on every function and state variable; compile with a Solidity version that makes this an error.",
            &["visibility", "access-control"],
        ),
        doc(
            "swc-101",
            "Integer Overflow and Underflow",
            &["SWC-101", "CWE-190"],
            "Arithmetic on fixed-width integers wraps silently without checked math or Solidity >=0.8.",
            "A `uint256` balance decremented below zero wraps to a near-maximal value instead of reverting, and the inverse holds for overflow on addition or multiplication. This is exploitable anywhere a balance, allowance, or counter is adjusted from user-controlled input.",
            "Use Solidity 0.8+ with its built-in overflow checks, or OpenZeppelin's SafeMath for earlier versions; still validate economically meaningful bounds explicitly.",
            &["arithmetic", "defi"],
        ),
        doc(
            "swc-102",
            "Outdated Compiler Version",
            &["SWC-102"],
            "Targeting an old Solidity compiler misses bug fixes and security-relevant checks introduced in later releases.",
            "Each Solidity release fixes miscompilation and semantic bugs; pinning to an old version forgoes those fixes even when the code itself looks correct. Some historical compiler versions have had bugs in ABI encoding, inline assembly handling, or optimizer passes that silently changed contract behavior.",
            "Compile with a current, well-audited compiler release and track the Solidity release notes for security-relevant fixes.",
            &["compiler", "tooling"],
        ),
        doc(
            "swc-103",
            "Floating Pragma",
            &["SWC-103"],
            "A pragma statement like `pragma solidity ^0.8.0;` allows compilation with any matching minor/patch version, including ones not audited.",
            "Contracts are frequently audited against one specific compiler version. A floating pragma means the deployed bytecode can be produced by a compiler release the audit never saw, including one with a later-discovered miscompilation bug.",
            "Lock the pragma to an exact version (`pragma solidity 0.8.24;`) for anything approaching production deployment.",
            &["compiler", "pragma"],
        ),
        doc(
            "swc-104",
            "Unchecked Call Return Value",
            &["SWC-104", "CWE-252"],
            "Low-level `call`, `send`, and `delegatecall` return a boolean success flag that is silently ignored rather than checked.",
            "Unlike a plain Solidity function call, `address.call(...)` does not revert on failure by default; it returns `false`. Code that assumes the call succeeded (e.g. treating a failed token transfer as if it happened) can leave accounting inconsistent with actual balances.",
            "Check the boolean return value of every low-level call and revert (or handle explicitly) on failure; prefer the higher-level call wrappers that revert automatically where available.",
            &["external-call", "error-handling"],
        ),
        doc(
            "swc-105",
            "Unprotected Ether Withdrawal",
            &["SWC-105"],
            "A withdrawal function lacks access control, letting any caller drain funds meant for a specific owner or set of depositors.",
            "This typically appears as a withdraw or sweep function missing an owner check, sometimes introduced by a refactor that moved access-control logic elsewhere and forgot to carry it along.",
            "Guard withdrawal paths with an explicit ownership or role check, and write a test that asserts a non-owner call reverts.",
            &["access-control", "funds"],
        ),
        doc(
            "swc-106",
            "Unprotected SELFDESTRUCT Instruction",
            &["SWC-106"],
            "A contract exposes a self-destruct path without access control, letting anyone destroy the contract and force-send its balance.",
            "Even a contract with otherwise solid access control can be destroyed if a single selfdestruct-triggering function is left unguarded, often a leftover debug or upgrade-migration function.",
            "Restrict selfdestruct to a privileged role, or avoid the opcode entirely given its EIP-6780 semantic changes and general fragility.",
            &["access-control", "selfdestruct"],
        ),
        doc(
            "swc-107",
            "Reentrancy",
            &["SWC-107", "CWE-841"],
            "An external call is made before the contract's own state is updated, letting the callee re-enter and repeat an action against stale state.",
            "The canonical pattern: a withdraw function sends Ether to the caller via a raw call, then only afterward zeroes the caller's balance. The receiving contract's fallback function re-enters withdraw before the balance is zeroed, draining funds across multiple nested calls in a single transaction. Cross-function and cross-contract reentrancy variants reuse shared state in the same way.",
            "Apply checks-effects-interactions: update all state before any external call, and/or use a reentrancy guard modifier on functions that both touch external contracts and mutate sensitive state.",
            &["reentrancy", "external-call", "defi"],
        ),
        doc(
            "swc-108",
            "State Variable Default Visibility",
            &["SWC-108"],
            "A state variable without an explicit visibility modifier defaults to `internal`, which can be a silent mismatch with the author's intent.",
            "Developers sometimes assume an unmarked state variable is private when it is actually internal and thus visible to derived contracts, or assume it's internal when a getter was in fact intended.",
            "Always declare state variable visibility explicitly, and remember that `private`/`internal` only restrict Solidity-level access, not on-chain storage readability.",
            &["visibility", "storage"],
        ),
        doc(
            "swc-109",
            "Uninitialized Storage Pointer",
            &["SWC-109"],
            "A local storage-typed variable left uninitialized defaults to slot zero, letting writes through it corrupt unrelated state.",
            "In older Solidity versions, declaring a local `struct` or array variable as `storage` without assigning it immediately aliases storage slot 0 (often the first state variable). Writes to fields on that variable silently clobber whatever lives in that slot.",
            "Always initialize storage-reference locals explicitly, or rely on compiler versions that reject this as an error.",
            &["storage", "compiler"],
        ),
        doc(
            "swc-110",
            "Assert Violation",
            &["SWC-110", "CWE-617"],
            "An `assert` statement is reachable under normal (non-invariant-breaking) conditions, consuming all remaining gas on failure instead of refunding the caller.",
            "`assert` is meant to guard internal invariants that should be unreachable by construction; using it for input validation means any malformed-but-reachable input burns the caller's entire gas allowance rather than reverting cleanly.",
            "Use `require` with a descriptive message for anything reachable from external input, reserving `assert` for conditions that truly should never fail.",
            &["error-handling", "gas"],
        ),
        doc(
            "swc-111",
            "Use of Deprecated Solidity Functions",
            &["SWC-111"],
            "The contract calls deprecated built-ins such as `sha3`, `suicide`, `callcode`, or `throw`.",
            "Deprecated aliases are usually kept for backward compatibility only and may be removed in a future compiler version, or carry subtly different semantics than their replacement (e.g. `callcode` vs `delegatecall` context handling).",
            "Replace deprecated calls with their modern equivalents (`keccak256`, `selfdestruct`, `delegatecall`, `revert`).",
            &["compiler", "deprecated"],
        ),
        doc(
            "swc-112",
            "Delegatecall to Untrusted Callee",
            &["SWC-112", "CWE-829"],
            "A `delegatecall` target is derived from user input or otherwise untrusted, letting the callee execute arbitrary code in the caller's storage context.",
            "Because delegatecall runs the callee's code with the caller's storage, msg.sender, and msg.value, an attacker-controlled delegatecall target can overwrite any storage slot, including the owner address or implementation pointer in a proxy.",
            "Restrict delegatecall targets to an immutable, audited address set at deployment, or behind strict access control if it must be configurable.",
            &["delegatecall", "proxy", "access-control"],
        ),
        doc(
            "swc-113",
            "DoS with Failed Call",
            &["SWC-113", "CWE-400"],
            "A loop sends Ether or makes an external call to each of several addresses, and a single reverting recipient blocks all subsequent iterations.",
            "A common pattern is paying out a list of recipients in a single transaction; if one recipient is a contract that reverts on receipt (intentionally or due to a gas-limited fallback), the whole payout transaction reverts for everyone.",
            "Use a pull-payment pattern where each recipient withdraws their own balance, rather than pushing payments in a loop.",
            &["dos", "external-call", "defi"],
        ),
        doc(
            "swc-114",
            "Transaction Order Dependence",
            &["SWC-114", "CWE-362"],
            "Contract behavior depends on which of several pending transactions is mined first, letting a miner or a fast follower front-run a state-changing call.",
            "Classic examples include a reward-claiming contract where changing the reward amount and a claim transaction race, or an approve/transferFrom sequence where the spender's allowance changes mid-flight.",
            "Use commit-reveal schemes, minimum/maximum acceptable value bounds on state-dependent calls, or design state transitions to be order-independent where possible.",
            &["front-running", "ordering"],
        ),
        doc(
            "swc-115",
            "Authorization through tx.origin",
            &["SWC-115", "CWE-477"],
            "Access control checks `tx.origin == owner` instead of `msg.sender`, which a malicious intermediate contract can bypass.",
            "If the owner is tricked into calling a malicious contract, that contract can call back into the target with `tx.origin` still equal to the owner's address even though `msg.sender` is the malicious contract, satisfying a tx.origin check that should have failed.",
            "Use `msg.sender` for authorization checks; reserve `tx.origin` for the rare case where the original externally-owned-account sender is genuinely needed and the implications are understood.",
            &["access-control", "tx-origin"],
        ),
        doc(
            "swc-116",
            "Block Values as a Proxy for Time",
            &["SWC-116", "CWE-829"],
            "Contract logic treats `block.timestamp` or `block.number` as precise time, but miners have limited influence over both.",
            "A miner can adjust a block's timestamp by a small amount within protocol-allowed bounds, which is enough to tip the outcome of a timing-sensitive contract (e.g. a lottery using `block.timestamp` as a source of randomness or a narrow deadline check).",
            "Avoid using block values for anything requiring precision narrower than tens of seconds, and never as a randomness source.",
            &["timestamp", "randomness"],
        ),
        doc(
            "swc-117",
            "Signature Malleability",
            &["SWC-117", "CWE-347"],
            "ECDSA signature verification does not constrain `s` to the lower half of the curve order, allowing a second valid signature for the same message.",
            "secp256k1 signatures have two mathematically valid `(r, s)` pairs per message; if a contract uses the signature itself (rather than the signed message) as a unique identifier, for example to prevent replay, an attacker can derive the second valid signature and bypass the uniqueness check.",
            "Use a vetted signature library (such as OpenZeppelin's ECDSA) that rejects the upper-range `s` value, and key replay protection on the message content (e.g. a nonce), not the signature bytes.",
            &["signatures", "replay"],
        ),
        doc(
            "swc-118",
            "Incorrect Constructor Name",
            &["SWC-118"],
            "A function intended as the constructor is misspelled relative to the contract name, so it becomes an ordinary callable function instead of running once at deployment.",
            "Before Solidity 0.4.22 introduced the `constructor` keyword, the constructor was any function named identically to the contract. A typo meant that function became a normal public function, callable by anyone after deployment to, for example, reassign the owner.",
            "Use the `constructor` keyword exclusively; this class of bug cannot occur on modern compiler versions.",
            &["constructor", "access-control"],
        ),
        doc(
            "swc-119",
            "Shadowing State Variables",
            &["SWC-119", "CWE-710"],
            "A derived contract declares a state variable with the same name as one in a base contract, silently shadowing it rather than sharing storage.",
            "This often happens across a multi-contract inheritance chain maintained by different authors; code that assumes it's reading/writing the base contract's variable is actually operating on an independent shadow copy in a different storage slot.",
            "Enable the compiler's shadowing warnings and treat them as errors; avoid redeclaring identically named state variables across an inheritance hierarchy.",
            &["inheritance", "storage"],
        ),
        doc(
            "swc-120",
            "Weak Sources of Randomness from Chain Attributes",
            &["SWC-120", "CWE-330"],
            "On-chain randomness derived from block hash, timestamp, or difficulty can be predicted or influenced by a miner before the transaction using it is confirmed.",
            "A lottery or loot-box contract that seeds randomness from `blockhash(block.number - 1)` is exploitable: a miner (or anyone simulating the pending block) can compute the outcome before committing, and only proceed with the transaction that benefits them.",
            "Use a verifiable randomness source such as Chainlink VRF, or a commit-reveal scheme with economic penalties for non-reveal.",
            &["randomness", "defi"],
        ),
        doc(
            "swc-121",
            "Missing Protection against Signature Replay Attacks",
            &["SWC-121", "CWE-347"],
            "A signed message is accepted without a nonce or chain identifier binding it to one specific use, letting it be replayed.",
            "A meta-transaction or off-chain-signed approval scheme that doesn't track used signatures (or doesn't bind to a specific chain ID) can have the same signature replayed on another deployment of the contract, on a different chain, or even multiple times on the same chain.",
            "Include a per-signer nonce and the chain ID in the signed payload, and mark each (signer, nonce) pair used once verified.",
            &["signatures", "replay"],
        ),
        doc(
            "swc-122",
            "Lack of Proper Signature Verification",
            &["SWC-122"],
            "Off-chain data or a signed message is trusted without actually recovering and checking the signer against an expected authority.",
            "Some contracts accept an oracle price update or an authorization payload and check only that a signature field is non-empty, or recover a signer but never compare it against an allow-list, effectively accepting signatures from anyone.",
            "Always recover the signer with `ecrecover` (or a vetted wrapper) and explicitly compare it against the expected authorized address.",
            &["signatures", "oracle"],
        ),
        doc(
            "swc-123",
            "Requirement Violation",
            &["SWC-123"],
            "A `require` statement that should hold under normal operation is being violated, indicating a logic error rather than genuine invalid input.",
            "This is less a specific bug pattern than a symptom: a `require` meant to encode a safe precondition is tripping during ordinary use, which usually means the precondition itself, or the state leading up to it, is wrong.",
            "Treat a failing require as a signal to re-examine the surrounding logic and state transitions, not just to loosen or remove the check.",
            &["requirements", "logic"],
        ),
        doc(
            "swc-124",
            "Write to Arbitrary Storage Location",
            &["SWC-124", "CWE-787"],
            "An array or mapping index derived from unchecked user input is used as a storage slot to write to, letting an attacker overwrite arbitrary state.",
            "If a contract exposes something like `data[userIndex] = userValue` without bounding `userIndex` to the array's actual length, and the array is dynamically sized in a way that doesn't revert on out-of-range access, the write can land on an unrelated storage slot such as the owner address.",
            "Bound all index values against the actual collection length before writing, and prefer mappings over raw low-level storage arithmetic.",
            &["storage", "access-control"],
        ),
        doc(
            "swc-125",
            "Incorrect Inheritance Order",
            &["SWC-125"],
            "Solidity's C3 linearization resolves multiple inheritance in an order that doesn't match the declared `is` list's intuitive reading, changing which base implementation actually runs.",
            "When several base contracts define the same function, the most-derived-first linearization order determines which implementation wins; developers who assume left-to-right declaration order matches resolution order can end up invoking the wrong base logic.",
            "Keep inheritance chains shallow, and explicitly verify linearization order (or the compiler's resolution) whenever more than one base defines an overlapping function.",
            &["inheritance"],
        ),
        doc(
            "swc-126",
            "Insufficient Gas Griefing",
            &["SWC-126", "CWE-400"],
            "A contract forwards a caller-specified or otherwise insufficient amount of gas to a sub-call, letting a griefer make that sub-call fail without reverting the whole transaction.",
            "Relayer-style contracts that accept a gas parameter for a sub-call from an untrusted caller are vulnerable to the caller supplying just enough gas for the outer call to succeed but not enough for the forwarded sub-call, silently breaking the relayed operation.",
            "Forward all remaining gas by default, or validate that the caller-supplied gas parameter meets a sane minimum before using it.",
            &["gas", "relayer"],
        ),
        doc(
            "swc-127",
            "Arbitrary Jump with Function Type Variable",
            &["SWC-127", "CWE-695"],
            "A variable of function type is assigned from untrusted or corrupted storage, letting execution jump to an attacker-chosen code location.",
            "This is most relevant to contracts written with inline assembly or that store function pointers in storage slots reachable by an arbitrary-write bug (see SWC-124); combined, they allow redirecting control flow entirely.",
            "Avoid storing function-type variables in storage reachable by unchecked writes; keep function pointer usage local and compiler-checked where possible.",
            &["assembly", "storage"],
        ),
        doc(
            "swc-128",
            "DoS With Block Gas Limit",
            &["SWC-128", "CWE-400"],
            "An operation iterates over a collection whose size is unbounded or attacker-influenced, eventually exceeding the block gas limit and becoming permanently uncallable.",
            "A classic example is an array of depositors that every distribution function loops over; once enough addresses have deposited, the loop's gas cost exceeds what any block can hold, freezing the distribution logic for everyone, including earlier depositors.",
            "Bound loop iteration counts, paginate over large collections across multiple transactions, or use pull-based withdrawal patterns instead of iterating.",
            &["dos", "gas"],
        ),
        doc(
            "swc-131",
            "Presence of Unused Variables",
            &["SWC-131"],
            "Unused local variables or unused function parameters often indicate an incomplete refactor or a check that was meant to use them but doesn't.",
            "This is usually benign on its own, but is a useful signal: an unused parameter named like a limit or threshold is a strong hint that validation logic intended to reference it was dropped somewhere along the way.",
            "Enable the compiler's unused-variable warnings and treat them as worth investigating, not just silencing.",
            &["code-quality"],
        ),
        doc(
            "swc-132",
            "Unexpected Ether Balance",
            &["SWC-132"],
            "A contract's logic assumes its own Ether balance only changes through its defined entry points, but `selfdestruct` and pre-funding can add balance outside that control flow.",
            "Anyone can force-send Ether to any address via `selfdestruct(target)` regardless of whether `target` has a payable fallback, and a contract can also be pre-funded before deployment at its predicted address. Contracts that compute internal accounting as `address(this).balance` rather than tracking deposits explicitly can desynchronize from reality.",
            "Track deposits and balances in explicit state variables rather than reading `address(this).balance` for accounting decisions.",
            &["funds", "accounting"],
        ),
        doc(
            "swc-133",
            "Hash Collisions With Multiple Variable Length Arguments",
            &["SWC-133", "CWE-294"],
            "`abi.encodePacked` concatenates multiple dynamic-length arguments without delimiters, letting two distinct input sets hash to the same value.",
            "If a signature scheme hashes, say, a username string and a following array with `abi.encodePacked`, shifting characters from one field to the adjacent field can produce an identical packed byte sequence and thus an identical hash, even though the logical inputs differ.",
            "Use `abi.encode` (which includes length-prefixing) instead of `abi.encodePacked` whenever hashing more than one dynamic-length argument.",
            &["hashing", "encoding"],
        ),
        doc(
            "swc-134",
            "Message call with hardcoded gas amount",
            &["SWC-134"],
            "A `.transfer()` or `.send()` call forwards a fixed 2300-gas stipend, which can be insufficient for a recipient whose fallback does real work, or after a gas-cost-changing hard fork.",
            "A recipient contract with a fallback function that writes to storage (for example, to log received deposits) can exceed the 2300-gas stipend and have the transfer revert, breaking any sender logic that assumed `transfer` would simply work.",
            "Use a low-level `call` with an explicit amount of forwarded gas and check its return value, rather than relying on `transfer`/`send`'s fixed stipend.",
            &["gas", "external-call"],
        ),
        doc(
            "swc-135",
            "Code With No Effects",
            &["SWC-135"],
            "A statement or call has no observable effect, often because a return value needed to produce the intended effect was discarded.",
            "A common instance is calling a function that returns a new value (e.g. a math helper) without assigning or using the result, under the mistaken belief that the call mutates state in place.",
            "Review any statement whose return value is discarded for whether that was intentional, particularly around pure/view helper calls.",
            &["code-quality"],
        ),
        doc(
            "swc-136",
            "Unencrypted Private Data On-Chain",
            &["SWC-136", "CWE-215"],
            "Data intended to stay confidential is stored in a contract's state variables, which are readable by anyone inspecting chain state regardless of Solidity visibility modifiers.",
            "`private`/`internal` only restrict which Solidity code can reference a variable by name; the underlying storage slot value is still publicly readable via RPC calls like `eth_getStorageAt`. Commit-reveal schemes that store the unrevealed value as plaintext defeat their own purpose.",
            "Never rely on contract storage for true confidentiality; use commitment hashes on-chain with the actual value kept off-chain until reveal.",
            &["privacy", "storage"],
        ),
        doc(
            "swc-0-unprotected-initializer",
            "Unprotected Initializer in Upgradeable Contract",
            &["SWC-118", "CWE-665"],
            "An upgradeable (proxy-pattern) contract's `initialize` function lacks a guard against being called more than once or by an arbitrary caller.",
            "Upgradeable contracts replace the constructor with an `initialize` function since constructors don't run in a proxy's storage context. Without an initializer guard, anyone can call `initialize` on the implementation or proxy after deployment, potentially becoming the owner or otherwise reconfiguring critical state.",
            "Use an initializer guard (such as OpenZeppelin's `Initializable`) and call `_disableInitializers()` in the implementation contract's constructor.",
            &["proxy", "upgradeable", "access-control"],
        ),
        doc(
            "defi-flash-loan-price-manipulation",
            "Flash Loan Price Oracle Manipulation",
            &["CWE-841"],
            "A protocol prices an asset using the spot reserves of a single on-chain liquidity pool, which a flash loan can temporarily distort within one transaction.",
            "An attacker borrows a large flash loan, swaps it through the target pool to skew the reported spot price, performs an action priced off that distorted value (such as borrowing against inflated collateral or triggering favorable liquidation math), then repays the flash loan, all atomically in one transaction.",
            "Use a time-weighted average price (TWAP) or a decentralized oracle network rather than a single pool's instantaneous spot price for anything economically sensitive.",
            &["defi", "oracle", "flash-loan"],
        ),
        doc(
            "defi-first-depositor-inflation",
            "ERC-4626 First Depositor Share Inflation",
            &["CWE-682"],
            "A vault's share-to-asset conversion can be manipulated by the very first depositor donating assets directly to the vault, inflating the exchange rate against subsequent depositors.",
            "The first depositor mints a minimal number of shares, then transfers a large amount of the underlying asset directly to the vault contract (bypassing the deposit function). This inflates the assets-per-share ratio so severely that the next depositor's small deposit rounds down to zero shares minted, effectively donating their deposit to the attacker.",
            "Mint a minimum initial share amount to a dead address at vault creation, or use an internal offset/virtual shares approach (as in OpenZeppelin's ERC-4626 implementation) to make the attack prohibitively expensive.",
            &["defi", "vault", "erc4626"],
        ),
        doc(
            "defi-unchecked-erc20-return",
            "Non-Standard ERC-20 Return Value Handling",
            &["SWC-104"],
            "Code assumes every ERC-20 `transfer`/`transferFrom` returns a boolean and reverts on failure, but some widely-used tokens (e.g. older USDT) don't return a value at all or behave differently on failure.",
            "A contract written against the strict ERC-20 interface that calls `token.transfer(...)` and checks the boolean result will revert unexpectedly (or, worse, silently misinterpret non-boolean return data) when integrated with a token that doesn't conform exactly to the standard.",
            "Use a safe-transfer wrapper (such as OpenZeppelin's SafeERC20) that handles both boolean-returning and void-returning token implementations uniformly.",
            &["defi", "erc20", "tokens"],
        ),
        doc(
            "defi-sandwich-attack",
            "AMM Sandwich Attack via Unbounded Slippage",
            &["CWE-841"],
            "A swap function accepts a trade without an enforced minimum output amount, letting a third party front-run and back-run it to extract the difference.",
            "An attacker observes a pending swap transaction in the mempool, submits a transaction just before it to move the price against the victim, lets the victim's swap execute at the worse price, then submits a transaction just after to move the price back, pocketing the spread.",
            "Always require a minimum acceptable output (or maximum acceptable input) on swap calls, and consider using private transaction relays for sensitive trades.",
            &["defi", "mev", "front-running"],
        ),
        doc(
            "defi-governance-flash-loan-voting",
            "Flash Loan Governance Takeover",
            &["CWE-841"],
            "A governance system counts voting power from a token balance snapshot taken at proposal execution time rather than a fixed historical block, letting a flash-borrowed balance swing a vote.",
            "An attacker flash-borrows a large amount of the governance token, votes on (and potentially immediately executes) a malicious proposal within the same transaction, then repays the loan, having never held economic exposure to the token.",
            "Snapshot voting power at proposal creation (or another fixed historical block) using a checkpointed balance, rather than the live balance at vote time.",
            &["defi", "governance", "flash-loan"],
        ),
        doc(
            "defi-centralized-oracle-single-source",
            "Single-Source Price Feed Dependency",
            &["CWE-1173"],
            "A protocol's critical pricing logic depends on one oracle provider with no fallback or sanity check, so that provider's outage or manipulation directly compromises the protocol.",
            "If the sole price feed returns a stale, zero, or extreme value (whether from an outage, a misconfiguration, or an upstream compromise) and the consuming contract doesn't validate the result, downstream logic such as liquidations or collateral valuation can execute against a wildly wrong price.",
            "Cross-check prices across multiple independent oracle sources, validate staleness and bounds on every read, and fail safe (pause rather than proceed) when checks fail.",
            &["defi", "oracle"],
        ),
        doc(
            "proxy-storage-collision",
            "Proxy Storage Slot Collision",
            &["SWC-124"],
            "An upgradeable proxy and its implementation contract declare state variables that land on overlapping storage slots, corrupting each other's data across an upgrade.",
            "Transparent and UUPS proxies share a single storage space with their implementation; if the proxy's own admin/implementation-pointer variables aren't placed at slots computed to avoid collision (as in EIP-1967), or if a new implementation's variable layout doesn't append-only extend the previous one, an upgrade can silently corrupt existing state.",
            "Use the EIP-1967 standard storage slots for proxy-owned state, and only ever append new state variables to the end of an implementation contract's storage layout across upgrades.",
            &["proxy", "upgradeable", "storage"],
        ),
        doc(
            "defi-read-only-reentrancy",
            "Read-Only Reentrancy via Stale View State",
            &["CWE-841"],
            "A view function reads state that a reentrant call can observe mid-update, even though the calling contract itself has no reentrancy guard gap on its own state-mutating path.",
            "A classic instance: an AMM pool updates its reserves only after sending Ether or tokens out during a withdrawal, and a view function like `get_virtual_price` computes a price from those reserves. A reentrant callback during the withdrawal's external call reads the view function while reserves are in their stale, pre-update state, and an integrating protocol that trusts that view's return value during the callback window is priced off manipulated data even though the pool contract itself never loses funds directly.",
            "Apply checks-effects-interactions to state read by view functions as well as state-mutating ones, or have integrators snapshot state in a way that can't observe mid-call values, such as requiring a non-reentrant read lock shared with the mutating functions.",
            &["reentrancy", "defi", "oracle"],
        ),
        doc(
            "defi-erc777-hook-reentrancy",
            "ERC-777/ERC-1155 Transfer Hook Reentrancy",
            &["SWC-107", "CWE-841"],
            "A token standard's mandatory transfer hook (`tokensReceived`, `onERC1155Received`, etc.) runs arbitrary recipient code mid-transfer, reintroducing reentrancy risk even in code that looks otherwise call-safe against plain ERC-20.",
            "Unlike ERC-20, ERC-777 and ERC-1155 invoke a callback on the recipient as part of a standard-compliant transfer. A contract that performs checks-effects-interactions correctly against ERC-20's call-free transfer can still be reentered through this callback if it integrates an ERC-777/ERC-1155 token, because the \"interaction\" step now happens earlier, inside the transfer call itself, than the author assumed.",
            "Apply a reentrancy guard to any function that transfers an ERC-777/ERC-1155 asset and also touches sensitive shared state, and treat the transfer call itself as untrusted external code, not as a simple balance update.",
            &["reentrancy", "defi", "tokens"],
        ),
        doc(
            "proxy-uninitialized-implementation",
            "Uninitialized Proxy Implementation Contract",
            &["SWC-118", "CWE-665"],
            "The logic contract behind a proxy can itself be initialized and taken over directly, independent of the proxy's own storage and initializer guard.",
            "Proxy patterns guard the proxy's `initialize` call, but the implementation contract is also a deployed, callable contract in its own right; if its constructor doesn't disable initialization, an attacker can call `initialize` directly on the implementation address, become its owner, and in some proxy designs (notably UUPS, where `upgradeTo` lives on the implementation) use that to `selfdestruct` or hijack the shared logic every proxy delegates to.",
            "Call `_disableInitializers()` (or equivalent) in the implementation contract's constructor so it can never be initialized directly, independent of any guard on the proxy side.",
            &["proxy", "upgradeable", "access-control"],
        ),
        doc(
            "access-control-missing-role-check",
            "Missing Role-Based Access Control Check",
            &["CWE-862"],
            "A privileged function (minting, pausing, fee changes, parameter updates) lacks any role or ownership gate, making it callable by any account.",
            "This frequently appears on functions added late in development (emergency pause, parameter tuning) that were tested in isolation without the access-control modifier applied elsewhere in the contract, and the gap is only caught if someone reviews every state-changing function's modifier list.",
            "Audit every state-changing public/external function for an explicit access-control modifier, and prefer a centralized role-management pattern (such as OpenZeppelin AccessControl) over ad hoc owner checks scattered through the contract.",
            &["access-control"],
        ),
        doc(
            "gas-griefing-unbounded-external-call-loop",
            "Unbounded External Call Loop Gas Griefing",
            &["SWC-113", "SWC-128"],
            "A function loops over an externally-influenced list of addresses, calling out to each one, combining the DoS-by-gas-limit and DoS-by-failed-call patterns into a single failure mode.",
            "Beyond the two individual failure modes (gas limit exhaustion and a single reverting recipient blocking the batch), attacker-controlled entries in the iterated list can also be crafted to consume disproportionate gas in their fallback function, amplifying the cost of the loop for everyone.",
            "Replace push-based iteration with pull-based withdrawal, and if iteration is unavoidable, cap both the list length and the gas forwarded per iteration.",
            &["dos", "gas", "external-call"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_has_at_least_forty_entries() {
        assert!(builtin_corpus().len() >= 40);
    }

    #[test]
    fn corpus_ids_are_unique() {
        let corpus = builtin_corpus();
        let mut ids: Vec<&str> = corpus.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), corpus.len());
    }

    #[test]
    fn every_entry_has_non_empty_remediation() {
        for document in builtin_corpus() {
            assert!(!document.remediation.is_empty(), "{} missing remediation", document.id);
        }
    }
}

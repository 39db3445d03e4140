//! Settlement paths
//!
//! ## Purpose
//!
//! A quoted swap is settled as a flat list of transfer legs. Every position
//! that takes part contributes exactly two legs, the trader paying the
//! position's owner and the owner paying the trader, and an optional final
//! leg pays the router fee. This module converts between per-position
//! [`SwapOutput`]s and that leg list, and validates lists proposed back by
//! a submitter.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::{AmmError, Result};
use crate::identity::{normalize_account, PositionId};
use crate::integer::parse_positive;
use crate::position::SwapOutput;

/// One transfer leg. `position_id` is `None` for the router fee leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    #[serde(rename = "lpId", with = "fee_leg_id")]
    pub position_id: Option<PositionId>,
    pub from: String,
    pub to: String,
    pub token_tag: String,
    pub amount: String,
}

impl Path {
    pub fn is_fee_leg(&self) -> bool {
        self.position_id.is_none()
    }
}

/// What one position is asked to settle: its input and the promised output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapInput {
    pub position_id: PositionId,
    pub token_in: String,
    pub amount_in: BigInt,
    pub token_out: String,
    pub amount_out: BigInt,
}

/// Aggregate of several same-direction outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSummary {
    pub token_in: String,
    pub amount_in: BigInt,
    pub token_out: String,
    pub amount_out: BigInt,
}

/// Sum outputs that all share the same token pair
pub fn summary_swap_outputs(outputs: &[SwapOutput]) -> Result<SwapSummary> {
    let (first, rest) = outputs.split_first().ok_or(AmmError::InvalidSwapOutputs)?;
    let mut summary = SwapSummary {
        token_in: first.token_in.clone(),
        amount_in: first.amount_in.clone(),
        token_out: first.token_out.clone(),
        amount_out: first.amount_out.clone(),
    };
    for output in rest {
        if output.token_in != summary.token_in || output.token_out != summary.token_out {
            return Err(AmmError::InvalidSwapOutputs);
        }
        summary.amount_in += &output.amount_in;
        summary.amount_out += &output.amount_out;
    }
    Ok(summary)
}

/// Expand outputs into `(trader -> owner, owner -> trader)` leg pairs.
/// `owner_of` resolves a position's owner; unknown positions fail.
pub fn swap_outputs_to_paths<'a, F>(trader: &str, outputs: &[SwapOutput], owner_of: F) -> Result<Vec<Path>>
where
    F: Fn(&PositionId) -> Option<&'a str>,
{
    let mut paths = Vec::with_capacity(outputs.len() * 2);
    for output in outputs {
        let owner = owner_of(&output.position_id).ok_or(AmmError::NoPosition)?;
        paths.push(Path {
            position_id: Some(output.position_id.clone()),
            from: trader.to_string(),
            to: owner.to_string(),
            token_tag: output.token_in.clone(),
            amount: output.amount_in.to_string(),
        });
        paths.push(Path {
            position_id: Some(output.position_id.clone()),
            from: owner.to_string(),
            to: trader.to_string(),
            token_tag: output.token_out.clone(),
            amount: output.amount_out.to_string(),
        });
    }
    Ok(paths)
}

#[derive(Default)]
struct Legs {
    count: usize,
    paid: Option<(String, BigInt)>,
    received: Option<(String, BigInt)>,
}

/// Rebuild per-position swap inputs from a leg list.
///
/// A trailing fee leg is ignored. Every position must appear in exactly
/// two legs, one paid by the trader and one paid to the trader.
pub fn paths_to_swap_inputs(trader: &str, paths: &[Path]) -> Result<BTreeMap<PositionId, SwapInput>> {
    let trader = normalize_account(trader)?;
    if paths.is_empty() {
        return Err(AmmError::InvalidPath);
    }
    let paths = match paths.split_last() {
        Some((last, rest)) if paths.len() % 2 != 0 && last.is_fee_leg() => rest,
        _ => paths,
    };
    if paths.len() % 2 != 0 {
        return Err(AmmError::InvalidPath);
    }

    let mut grouped: BTreeMap<PositionId, Legs> = BTreeMap::new();
    for path in paths {
        let position_id = path.position_id.clone().ok_or(AmmError::InvalidPath)?;
        let amount = parse_positive(&path.amount, AmmError::InvalidPath)?;
        let from = normalize_account(&path.from)?;
        let to = normalize_account(&path.to)?;

        let legs = grouped.entry(position_id).or_default();
        legs.count += 1;
        let slot = if from == trader {
            &mut legs.paid
        } else if to == trader {
            &mut legs.received
        } else {
            return Err(AmmError::InvalidPath);
        };
        if slot.is_some() {
            return Err(AmmError::InvalidPath);
        }
        *slot = Some((path.token_tag.clone(), amount));
    }

    grouped
        .into_iter()
        .map(|(position_id, legs)| match legs {
            Legs { count: 2, paid: Some((token_in, amount_in)), received: Some((token_out, amount_out)) } => {
                let input = SwapInput {
                    position_id: position_id.clone(),
                    token_in,
                    amount_in,
                    token_out,
                    amount_out,
                };
                Ok((position_id, input))
            }
            _ => Err(AmmError::InvalidPath),
        })
        .collect()
}

/// Fee legs carry an empty `lpId` on the wire
mod fee_leg_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::identity::PositionId;

    pub fn serialize<S: Serializer>(value: &Option<PositionId>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map(PositionId::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PositionId>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(if text.is_empty() { None } else { Some(PositionId::from(text.as_str())) })
    }
}

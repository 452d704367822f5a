use snowflaked::sync::Generator;
use tourney_api::id::{MatchId, RoundId, StageItemId};

const INSTANCE: u16 = 0;

static STAGE_ITEM: Generator = Generator::new_unchecked(INSTANCE);
static ROUND: Generator = Generator::new_unchecked(INSTANCE);
static MATCH: Generator = Generator::new_unchecked(INSTANCE);

#[inline]
pub fn stage_item() -> StageItemId {
    StageItemId(STAGE_ITEM.generate())
}

#[inline]
pub fn round() -> RoundId {
    RoundId(ROUND.generate())
}

#[inline]
pub fn match_id() -> MatchId {
    MatchId(MATCH.generate())
}

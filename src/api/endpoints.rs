//! Catalog of logical game operations.
//!
//! Every outbound request names one of these endpoints; the transport turns
//! it into a concrete URL, method, and header set. The server silently
//! rejects requests whose URL shape or referer deviates, so the mapping
//! lives in one place.

/// HTTP method for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A logical game operation.
///
/// Attack and skill share one URL; the server distinguishes them by the
/// presence of `skillId` in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    UserInfo,
    UserCityInfo,
    Explore,
    Attack,
    UseSkill,
    UseHealPotion,
    UseManaPotion,
    StartRest,
    EndRest,
    SellItems,
    BuyItems,
    ChangeMainGeo,
    ChangeGeo,
    ChangeSquare,
    CompleteBats,
}

impl Endpoint {
    /// URL path relative to the API base, without the token query parameter.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::UserInfo => "/user/info",
            Endpoint::UserCityInfo => "/user/city",
            Endpoint::Explore => "/farm/farm-mob-one",
            Endpoint::Attack | Endpoint::UseSkill => "/battle/user-attack",
            Endpoint::UseHealPotion | Endpoint::UseManaPotion => "/user/inventory/use-potion",
            Endpoint::StartRest => "/farm/add-fire",
            Endpoint::EndRest => "/farm/add-fire-end",
            Endpoint::SellItems => "/trader/sell",
            Endpoint::BuyItems => "/trader/buy",
            Endpoint::ChangeMainGeo => "/farm/change-main-geo",
            Endpoint::ChangeGeo => "/farm/change-geo",
            Endpoint::ChangeSquare => "/farm/change-square",
            Endpoint::CompleteBats => "/user/vesna",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::UserInfo | Endpoint::UserCityInfo => Method::Get,
            _ => Method::Post,
        }
    }

    /// Whether the server requires the token-bearing city referer on this
    /// endpoint. Explore, attack/skill, and geo changes are rejected
    /// without it.
    pub fn needs_referer(self) -> bool {
        matches!(
            self,
            Endpoint::Explore
                | Endpoint::Attack
                | Endpoint::UseSkill
                | Endpoint::ChangeMainGeo
                | Endpoint::ChangeGeo
                | Endpoint::ChangeSquare
        )
    }

    /// Short label for logging.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::UserInfo => "user-info",
            Endpoint::UserCityInfo => "user-city-info",
            Endpoint::Explore => "explore",
            Endpoint::Attack => "attack",
            Endpoint::UseSkill => "use-skill",
            Endpoint::UseHealPotion => "use-heal-potion",
            Endpoint::UseManaPotion => "use-mana-potion",
            Endpoint::StartRest => "start-rest",
            Endpoint::EndRest => "end-rest",
            Endpoint::SellItems => "sell-items",
            Endpoint::BuyItems => "buy-items",
            Endpoint::ChangeMainGeo => "change-main-geo",
            Endpoint::ChangeGeo => "change-geo",
            Endpoint::ChangeSquare => "change-square",
            Endpoint::CompleteBats => "complete-bats",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_and_skill_share_path() {
        assert_eq!(Endpoint::Attack.path(), Endpoint::UseSkill.path());
    }

    #[test]
    fn potions_share_path() {
        assert_eq!(
            Endpoint::UseHealPotion.path(),
            Endpoint::UseManaPotion.path()
        );
    }

    #[test]
    fn referer_set_matches_geo_and_battle() {
        assert!(Endpoint::Explore.needs_referer());
        assert!(Endpoint::Attack.needs_referer());
        assert!(Endpoint::ChangeSquare.needs_referer());
        assert!(!Endpoint::UserInfo.needs_referer());
        assert!(!Endpoint::SellItems.needs_referer());
    }

    #[test]
    fn info_endpoints_are_get() {
        assert_eq!(Endpoint::UserInfo.method(), Method::Get);
        assert_eq!(Endpoint::UserCityInfo.method(), Method::Get);
        assert_eq!(Endpoint::Explore.method(), Method::Post);
    }
}

//! Level point spending.
//!
//! One call spends exactly one point on one stat. Stat names are parsed into
//! the closed `Stat` set before the balance is checked.

use crate::{Error, Profile, Result, Stat};

/// Spend one level point on the stat named `stat_name`
pub fn upgrade(profile: &Profile, stat_name: &str) -> Result<Profile> {
    let stat: Stat = stat_name.parse()?;
    upgrade_stat(profile, stat)
}

/// Spend one level point on `stat`, returning the updated copy
pub fn upgrade_stat(profile: &Profile, stat: Stat) -> Result<Profile> {
    if profile.level_points == 0 {
        tracing::debug!("{} has no level points for {}", profile.user_id, stat);
        return Err(Error::InsufficientPoints);
    }

    let mut updated = profile.clone();
    let value = updated.stats.get_mut(stat);
    *value = value.checked_add(1).ok_or(Error::StatAtMaximum(stat))?;
    updated.level_points -= 1;

    tracing::info!(
        "{} upgraded {} to {} ({} points left)",
        profile.user_id,
        stat,
        updated.stats.get(stat),
        updated.level_points
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::get_default_catalog, UserId};
    use chrono::Utc;

    fn profile_with_points(points: u32) -> Profile {
        let mut profile = Profile::new(
            UserId::parse("lifter").unwrap(),
            get_default_catalog(),
            Utc::now(),
        );
        profile.level_points = points;
        profile
    }

    #[test]
    fn test_spend_single_point() {
        let profile = profile_with_points(1);

        let upgraded = upgrade(&profile, "agility").unwrap();
        assert_eq!(upgraded.level_points, 0);
        assert_eq!(upgraded.stats.agility, 11);
        assert_eq!(upgraded.stats.strength, 10);

        let again = upgrade(&upgraded, "agility");
        assert!(matches!(again, Err(Error::InsufficientPoints)));
        assert_eq!(upgraded.stats.agility, 11);
    }

    #[test]
    fn test_unknown_stat_fails_regardless_of_points() {
        for points in [0, 5] {
            let profile = profile_with_points(points);
            assert!(matches!(
                upgrade(&profile, "luck"),
                Err(Error::InvalidStat(name)) if name == "luck"
            ));
        }
    }

    #[test]
    fn test_maxed_stat_keeps_its_point() {
        let mut profile = profile_with_points(1);
        profile.stats.stamina = u32::MAX;

        let result = upgrade(&profile, "stamina");
        assert!(matches!(result, Err(Error::StatAtMaximum(Stat::Stamina))));
        assert_eq!(profile.level_points, 1);

        // Other stats still accept the point
        assert_eq!(upgrade(&profile, "strength").unwrap().stats.strength, 11);
    }

    #[test]
    fn test_stat_names_match_exactly() {
        let profile = profile_with_points(2);
        for name in ["  AGILITY ", "Agility", "stamina "] {
            assert!(matches!(
                upgrade(&profile, name),
                Err(Error::InvalidStat(n)) if n == name
            ));
        }
    }

    #[test]
    fn test_points_spread_across_stats() {
        let mut profile = profile_with_points(3);
        for stat in Stat::ALL {
            profile = upgrade_stat(&profile, stat).unwrap();
        }
        assert_eq!(profile.level_points, 0);
        for stat in Stat::ALL {
            assert_eq!(profile.stats.get(stat), 11);
        }
    }
}

//! Apply a built configuration and confirm the result by observation.
//!
//! A successful apply call is not trusted on its own: after a settle delay the
//! active paths are queried again and every monitor of the mode must be in
//! the state the mode asks for.

use std::time::Duration;

use super::catalog::active_serials;
use super::events::{EngineEvent, EventSink, Sleeper};
use super::identity::IdentityIndex;
use crate::constants::timing::SETTLE_DELAY_MS;
use crate::error::{AttemptError, Mismatch};
use crate::platform::{ApplyFlags, DisplayConfigService, DisplayConfiguration};
use crate::types::ResolvedMode;

pub fn apply_and_verify<S, Z, E>(
    service: &mut S,
    identity: &IdentityIndex,
    config: &DisplayConfiguration,
    mode: &ResolvedMode,
    sleeper: &mut Z,
    sink: &mut E,
) -> Result<(), AttemptError>
where
    S: DisplayConfigService + ?Sized,
    Z: Sleeper + ?Sized,
    E: EventSink + ?Sized,
{
    // Validation is advisory: a rejection is reported and the commit still runs.
    // TODO: make a rejected validation fatal once it is clear which rejections are spurious
    if let Err(e) = service.apply(Some(config), ApplyFlags::validate()) {
        sink.emit(EngineEvent::ValidationRejected(e));
    }

    service
        .apply(Some(config), ApplyFlags::commit())
        .map_err(AttemptError::Apply)?;
    sink.emit(EngineEvent::Applied {
        paths: config.paths.len(),
        modes: config.modes.len(),
    });

    sleeper.sleep(Duration::from_millis(SETTLE_DELAY_MS));

    let active = active_serials(&*service, identity, sink)?;
    let mismatches: Vec<Mismatch> = mode
        .displays
        .iter()
        .filter_map(|display| {
            let actual_active = active.contains(&display.serial);
            (actual_active != display.enabled).then(|| Mismatch {
                serial: display.serial.clone(),
                expected_active: display.enabled,
                actual_active,
            })
        })
        .collect();

    sink.emit(EngineEvent::Verified {
        active: active.into_iter().collect(),
        mismatches: mismatches.clone(),
    });

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(AttemptError::Verification(mismatches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::{RecordingSink, RecordingSleeper};
    use crate::error::{ServiceCall, ServiceError};
    use crate::platform::{AdapterId, ConfiguredPath, Rational, Rotation, Scaling, ScanLineOrdering};
    use crate::testing::FakeService;
    use crate::types::{DisplaySpec, Position};

    fn path(source_id: u32, target_id: u32) -> ConfiguredPath {
        ConfiguredPath {
            adapter_id: AdapterId::default(),
            source_id,
            target_id,
            active: true,
            source_mode_index: 0,
            target_mode_index: 1,
            refresh_rate: Rational::whole(60),
            rotation: Rotation::Identity,
            scaling: Scaling::Identity,
            scan_line_ordering: ScanLineOrdering::Progressive,
        }
    }

    fn setup() -> (FakeService, ResolvedMode) {
        let mut fake = FakeService::new();
        fake.add_path("S1", "UID1", 0, 1, true);
        fake.add_path("S2", "UID2", 1, 2, true);
        let mode = ResolvedMode {
            name: "solo".to_string(),
            displays: vec![
                DisplaySpec::enabled("S1", 1920, 1080, 60, Position::default(), true),
                DisplaySpec::disabled("S2"),
            ],
        };
        (fake, mode)
    }

    fn solo_config() -> DisplayConfiguration {
        DisplayConfiguration { paths: vec![path(0, 1)], modes: vec![] }
    }

    #[test]
    fn test_validates_then_commits_and_verifies() {
        let (mut fake, mode) = setup();
        let identity = fake.identity();
        let mut sleeper = RecordingSleeper::default();
        let mut sink = RecordingSink::default();

        apply_and_verify(&mut fake, &identity, &solo_config(), &mode, &mut sleeper, &mut sink).unwrap();

        let flags: Vec<_> = fake.applies.iter().map(|(flags, _)| *flags).collect();
        assert_eq!(flags, vec![ApplyFlags::validate(), ApplyFlags::commit()]);
        assert_eq!(sleeper.delays, vec![Duration::from_millis(SETTLE_DELAY_MS)]);
        assert!(sink.events.contains(&EngineEvent::Verified {
            active: vec!["S1".to_string()],
            mismatches: vec![],
        }));
    }

    #[test]
    fn test_validation_rejection_is_not_fatal() {
        let (mut fake, mode) = setup();
        fake.validate_status = Some(87);
        let identity = fake.identity();
        let mut sink = RecordingSink::default();

        let result = apply_and_verify(
            &mut fake,
            &identity,
            &solo_config(),
            &mode,
            &mut RecordingSleeper::default(),
            &mut sink,
        );

        assert!(result.is_ok());
        assert_eq!(fake.applies.len(), 2);
        assert_eq!(
            sink.events[0],
            EngineEvent::ValidationRejected(ServiceError::status(ServiceCall::Apply, 87))
        );
    }

    #[test]
    fn test_apply_failure_skips_verification() {
        let (mut fake, mode) = setup();
        fake.commit_status = Some(31);
        let identity = fake.identity();
        let mut sleeper = RecordingSleeper::default();

        let err = apply_and_verify(
            &mut fake,
            &identity,
            &solo_config(),
            &mode,
            &mut sleeper,
            &mut RecordingSink::default(),
        )
        .unwrap_err();

        assert_eq!(err, AttemptError::Apply(ServiceError::status(ServiceCall::Apply, 31)));
        assert!(sleeper.delays.is_empty());
    }

    #[test]
    fn test_monitor_that_stays_dark_is_a_mismatch() {
        let (mut fake, mut mode) = setup();
        fake.ignore_target(2);
        mode.displays[1] = DisplaySpec::enabled("S2", 1920, 1080, 60, Position::new(1920, 0), false);
        let config = DisplayConfiguration { paths: vec![path(0, 1), path(1, 2)], modes: vec![] };
        let identity = fake.identity();

        let err = apply_and_verify(
            &mut fake,
            &identity,
            &config,
            &mode,
            &mut RecordingSleeper::default(),
            &mut RecordingSink::default(),
        )
        .unwrap_err();

        assert_eq!(err, AttemptError::Verification(vec![Mismatch {
            serial: "S2".to_string(),
            expected_active: true,
            actual_active: false,
        }]));
    }

    #[test]
    fn test_monitor_that_stays_lit_is_a_mismatch() {
        let (mut fake, mode) = setup();
        // Platform keeps the old topology despite reporting success
        fake.commit_is_noop = true;
        let identity = fake.identity();

        let err = apply_and_verify(
            &mut fake,
            &identity,
            &solo_config(),
            &mode,
            &mut RecordingSleeper::default(),
            &mut RecordingSink::default(),
        )
        .unwrap_err();

        assert_eq!(err, AttemptError::Verification(vec![Mismatch {
            serial: "S2".to_string(),
            expected_active: false,
            actual_active: true,
        }]));
    }
}

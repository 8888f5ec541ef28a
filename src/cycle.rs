// cycle.rs

use embedded_hal::digital::OutputPin;
use log::*;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::*;

#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub session: SessionCheck,
    pub sample: Sample,
    pub alarm: bool,
    pub delivered: u8,
}

/// Guard, sample, actuate. The broker stays locked for the whole cycle so the
/// pump can't interleave with it.
pub async fn run_cycle<B, S, P>(state: &MyState<B, S, P>) -> CycleReport
where
    B: Broker,
    S: TempSensor,
    P: OutputPin,
{
    let mut broker = state.broker.lock().await;
    let session = ensure_session(&mut *broker, MQTT_CLIENT_ID);
    let sample = sample(&mut *state.sensor.lock().await);
    let act = actuate(&mut *broker, &mut *state.led.lock().await, &sample);

    let n = state.cycles.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(
        "cycle #{n}: {session:?} {t} alarm={a} delivered={d}/2",
        t = sample.formatted,
        a = act.alarm,
        d = act.delivered
    );

    CycleReport {
        session,
        sample,
        alarm: act.alarm,
        delivered: act.delivered,
    }
}

/// Fires once per `CYCLE_PERIOD`, first one period after the call.
pub async fn poll_cycle<B, S, P>(state: &MyState<B, S, P>) -> anyhow::Result<()>
where
    B: Broker,
    S: TempSensor,
    P: OutputPin,
{
    let mut ticker = interval_at(Instant::now() + CYCLE_PERIOD, CYCLE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        run_cycle(state).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, sleep_until};

    use super::*;
    use crate::testing::*;

    fn state(broker: FakeBroker, celsius: f32) -> MyState<FakeBroker, FakeSensor, FakeLed> {
        MyState::new(MyConfig::default(), broker, FakeSensor::new(celsius), FakeLed::default())
    }

    #[tokio::test]
    async fn boundary_reading_is_ok() {
        let st = state(FakeBroker::online(), 30.0);
        let r = run_cycle(&st).await;
        assert_eq!(r.session, SessionCheck::Live);
        assert!(!r.alarm);
        assert_eq!(st.led.lock().await.high, Some(false));
        let broker = st.broker.lock().await;
        assert_eq!(broker.delivered[0], (TOPIC_READING.to_string(), " 30.00".to_string()));
        assert_eq!(broker.delivered[1], (TOPIC_STATUS.to_string(), STATUS_OK.to_string()));
    }

    #[tokio::test]
    async fn just_above_boundary_alarms() {
        let st = state(FakeBroker::online(), 30.01);
        let r = run_cycle(&st).await;
        assert!(r.alarm);
        assert_eq!(r.sample.formatted.as_str(), " 30.01");
        assert_eq!(st.led.lock().await.high, Some(true));
        let broker = st.broker.lock().await;
        assert_eq!(broker.delivered[1], (TOPIC_STATUS.to_string(), STATUS_ALARM.to_string()));
    }

    #[tokio::test]
    async fn failed_reconnect_still_attempts_publishes() {
        let st = state(FakeBroker::default(), 25.0);
        let r = run_cycle(&st).await;
        assert_eq!(r.session, SessionCheck::Failed);
        assert_eq!(r.delivered, 0);
        assert_eq!(st.sensor.lock().await.requests, 1);
        assert_eq!(st.led.lock().await.high, Some(false));
        let broker = st.broker.lock().await;
        assert_eq!(broker.connect_attempts, 1);
        assert_eq!(
            broker.attempted,
            vec![
                (TOPIC_READING.to_string(), " 25.00".to_string()),
                (TOPIC_STATUS.to_string(), STATUS_OK.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn one_reconnect_per_cycle() {
        let st = state(FakeBroker::default(), 25.0);
        for n in 1..=3 {
            run_cycle(&st).await;
            assert_eq!(st.broker.lock().await.connect_attempts, n);
        }
    }

    #[tokio::test]
    async fn reconnect_then_publish() {
        let mut broker = FakeBroker::default();
        broker.accept_connect = true;
        let st = state(broker, 31.0);
        let r = run_cycle(&st).await;
        assert_eq!(r.session, SessionCheck::Reconnected);
        assert_eq!(r.delivered, 2);

        let r = run_cycle(&st).await;
        assert_eq!(r.session, SessionCheck::Live);
        assert_eq!(st.broker.lock().await.connect_attempts, 1);
    }

    #[tokio::test]
    async fn sensor_failure_publishes_sentinel() {
        let st = state(FakeBroker::online(), 22.0);
        st.sensor.lock().await.fail_read = true;
        let r = run_cycle(&st).await;
        assert!(!r.sample.sensor_ok);
        assert!(!r.alarm);
        let broker = st.broker.lock().await;
        assert_eq!(broker.delivered[0].1, "-127.00");
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_is_one_per_period() {
        let st = state(FakeBroker::online(), 20.0);
        let res = tokio::time::timeout(Duration::from_millis(5500), st.run()).await;
        assert!(res.is_err());
        assert_eq!(st.cycles.load(Ordering::Relaxed), 5);
        // pump runs many times per cycle, and doesn't change the cycle count
        assert!(st.pumps.load(Ordering::Relaxed) >= 500);
        assert_eq!(st.broker.lock().await.delivered.len(), 10);
        assert!(st.broker.lock().await.services >= 500);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_first_period() {
        let st = state(FakeBroker::online(), 20.0);
        let res = tokio::time::timeout(Duration::from_millis(900), poll_cycle(&st)).await;
        assert!(res.is_err());
        assert_eq!(st.cycles.load(Ordering::Relaxed), 0);
    }
    #[tokio::test(start_paused = true)]
    async fn overrun_skips_missed_ticks() {
        let st = state(FakeBroker::online(), 20.0);
        let start = Instant::now();

        // keeps the first cycle (due at 1 s) stuck until 3.5 s
        let slow_broker = async {
            sleep(Duration::from_millis(500)).await;
            let _held = st.broker.lock().await;
            sleep(Duration::from_millis(3000)).await;
        };
        let check = async {
            slow_broker.await;
            // the late cycle plus one catch-up, not one per missed tick
            sleep_until(start + Duration::from_millis(3600)).await;
            assert_eq!(st.cycles.load(Ordering::Relaxed), 2);
            // back on the 1 s grid
            sleep_until(start + Duration::from_millis(4200)).await;
            assert_eq!(st.cycles.load(Ordering::Relaxed), 3);
            sleep_until(start + Duration::from_millis(5100)).await;
            assert_eq!(st.cycles.load(Ordering::Relaxed), 4);
        };

        tokio::select! {
            _ = poll_cycle(&st) => panic!("poll_cycle() ended"),
            _ = check => {}
        }
    }
}

// EOF

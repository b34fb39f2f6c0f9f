//! # 호출 빈도 제어
//!
//! - `Throttle`: 간격마다 한 번만 값을 통과시킵니다. 간격 안에 들어온 값은 마지막 것만 보관했다가
//!   간격이 지나면 `flush()`로 꺼냅니다. (스크롤 처리: 스크롤이 멈춘 위치가 반영되어야 함)
//! - `Debouncer`: 연속 호출이 멈춘 뒤 `wait`가 지나면 마지막 호출만 실행합니다.
//!   `immediate` 모드에서는 반대로 첫 호출을 즉시 실행하고 이후 호출은 버립니다.
//!
//! 시간은 `tokio::time::Instant`를 사용하므로 테스트에서 가상 시간으로 검증할 수 있습니다.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: None,
        }
    }

    fn is_open(&self, now: Instant) -> bool {
        self.last
            .map_or(true, |last| now.duration_since(last) >= self.interval)
    }

    /// 간격 밖이면 값을 그대로 돌려주고 간격을 다시 시작합니다.
    /// 간격 안이면 값을 보관하고 None을 돌려줍니다. (먼저 보관된 값은 버려짐)
    pub fn call(&mut self, value: T) -> Option<T> {
        let now = Instant::now();
        if self.is_open(now) {
            self.last = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// 간격이 지났으면 보관된 마지막 값을 꺼냅니다.
    pub fn flush(&mut self) -> Option<T> {
        let now = Instant::now();
        if self.pending.is_none() || !self.is_open(now) {
            return None;
        }
        self.last = Some(now);
        self.pending.take()
    }
}

/// tokio 런타임 안에서만 사용할 수 있습니다.
#[derive(Debug)]
pub struct Debouncer {
    wait: Duration,
    immediate: bool,
    timer: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            immediate: false,
            timer: None,
        }
    }

    pub fn immediate(wait: Duration) -> Self {
        Self {
            wait,
            immediate: true,
            timer: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    pub fn call<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let call_now = self.immediate && !self.is_pending();
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let wait = self.wait;
        if self.immediate {
            if call_now {
                f();
            }
            // 대기 구간만 표시하는 타이머
            self.timer = Some(tokio::spawn(sleep(wait)));
        } else {
            self.timer = Some(tokio::spawn(async move {
                sleep(wait).await;
                f();
            }));
        }
    }

    /// 예약된 호출을 취소합니다.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

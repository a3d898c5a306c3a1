use blaster_core::geometry::{Bounds, Point};

use crate::config::WeaponConfig;
use crate::cooldown::FireCooldown;
use crate::pool::{FixedPool, PoolHandle};

/// One pooled shot. Inactive projectiles keep their last values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Projectile {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

impl Projectile {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Fires projectiles from a fixed pool and recycles them once they leave
/// the play area.
///
/// The pool belongs to this system alone; callers only ever see handles.
#[derive(Debug, Clone)]
pub struct WeaponSystem {
    config: WeaponConfig,
    cooldown: FireCooldown,
    pool: FixedPool<Projectile>,
    recycle_bounds: Bounds,
}

impl WeaponSystem {
    pub fn new(config: WeaponConfig, projectile_bounds: Bounds) -> Self {
        Self {
            cooldown: FireCooldown::new(config.fire_cooldown_ms),
            pool: FixedPool::create(config.pool_size, Projectile::default),
            recycle_bounds: projectile_bounds.inflated(config.bounds_margin),
            config,
        }
    }

    /// Advance the cooldown, move live projectiles and recycle the ones that
    /// left the inflated bounds.
    pub fn update(&mut self, dt_ms: f32) {
        self.cooldown.update(dt_ms);
        let dt_secs = dt_ms.max(0.0) / 1000.0;
        let bounds = self.recycle_bounds;
        self.pool.release_where(|p| {
            p.x += p.velocity_x * dt_secs;
            p.y += p.velocity_y * dt_secs;
            !bounds.contains(p.x, p.y)
        });
    }

    /// Fire from `(origin_x, origin_y)`. The shot's vertical velocity is
    /// `direction_y * projectile_speed`, so -1 is straight up at full speed
    /// and 0 leaves it standing. Returns false when the cooldown is running or the
    /// pool is exhausted; an exhausted pool does not cost a cooldown.
    pub fn try_fire(&mut self, origin_x: f32, origin_y: f32, direction_y: f32) -> bool {
        if !self.cooldown.consume() {
            return false;
        }
        let Some(handle) = self.pool.acquire() else {
            self.cooldown.refund();
            tracing::debug!(
                pool_size = self.config.pool_size,
                "Projectile pool exhausted, shot vetoed"
            );
            return false;
        };
        if let Some(projectile) = self.pool.get_mut(handle) {
            *projectile = Projectile {
                x: origin_x,
                y: origin_y,
                velocity_x: 0.0,
                velocity_y: direction_y * self.config.projectile_speed,
            };
        }
        true
    }

    pub fn can_fire(&self) -> bool {
        self.cooldown.can_fire()
    }

    /// Return a projectile to the pool, e.g. after it hit something.
    pub fn release_projectile(&mut self, handle: PoolHandle) -> bool {
        self.pool.release(handle)
    }

    /// Release every live projectile. A running cooldown keeps running.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    pub fn projectiles(&self) -> impl Iterator<Item = (PoolHandle, &Projectile)> + '_ {
        self.pool.iter_active()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: Bounds = Bounds::new(0.0, 800.0, 0.0, 600.0);

    fn weapon(cooldown_ms: f32, pool_size: usize) -> WeaponSystem {
        WeaponSystem::new(
            WeaponConfig {
                fire_cooldown_ms: cooldown_ms,
                projectile_speed: 500.0,
                pool_size,
                ..WeaponConfig::default()
            },
            FIELD,
        )
    }

    #[test]
    fn fires_upward_from_origin() {
        let mut weapon = weapon(100.0, 4);
        assert!(weapon.try_fire(400.0, 540.0, -1.0));
        let (_, shot) = weapon.projectiles().next().unwrap();
        assert_eq!(shot.position(), Point::new(400.0, 540.0));
        assert_eq!(shot.velocity_y, -500.0);
    }

    #[test]
    fn direction_scales_projectile_velocity() {
        let mut weapon = weapon(0.0, 4);
        assert!(weapon.try_fire(400.0, 300.0, 0.0));
        assert!(weapon.try_fire(400.0, 300.0, -0.5));
        let speeds: Vec<f32> = weapon.projectiles().map(|(_, p)| p.velocity_y).collect();
        assert_eq!(speeds, vec![0.0, -250.0]);
    }

    #[test]
    fn cooldown_blocks_second_shot() {
        let mut weapon = weapon(100.0, 4);
        assert!(weapon.try_fire(0.0, 0.0, -1.0));
        assert!(!weapon.try_fire(0.0, 0.0, -1.0));
        assert_eq!(weapon.active_count(), 1);
        weapon.update(100.0);
        assert!(weapon.try_fire(0.0, 300.0, -1.0));
    }

    #[test]
    fn exhausted_pool_refunds_cooldown() {
        let mut weapon = weapon(0.0, 1);
        assert!(weapon.try_fire(400.0, 300.0, -1.0));
        assert!(!weapon.try_fire(400.0, 300.0, -1.0), "pool is empty");
        assert!(weapon.can_fire(), "vetoed shot must not start the cooldown");

        let mut weapon = self::weapon(200.0, 1);
        assert!(weapon.try_fire(400.0, 300.0, -1.0));
        weapon.update(200.0);
        assert!(!weapon.try_fire(400.0, 300.0, -1.0));
        assert!(weapon.can_fire());
        let (handle, _) = weapon.projectiles().next().unwrap();
        assert!(weapon.release_projectile(handle));
        assert!(weapon.try_fire(400.0, 300.0, -1.0));
    }

    #[test]
    fn recycles_projectiles_past_margin() {
        let mut weapon = weapon(0.0, 2);
        assert!(weapon.try_fire(400.0, 10.0, -1.0));
        // 500 px/s for 80ms = 40px: y = -30, still within the 32px margin.
        weapon.update(80.0);
        assert_eq!(weapon.active_count(), 1);
        weapon.update(20.0);
        assert_eq!(weapon.active_count(), 0);
        assert_eq!(weapon.free_count(), 2);
    }

    #[test]
    fn clear_releases_everything() {
        let mut weapon = weapon(0.0, 3);
        weapon.try_fire(100.0, 300.0, -1.0);
        weapon.try_fire(200.0, 300.0, 1.0);
        weapon.clear();
        assert_eq!(weapon.active_count(), 0);
        assert_eq!(weapon.free_count(), 3);
    }

    #[test]
    fn clear_keeps_the_cooldown_running() {
        let mut weapon = weapon(200.0, 3);
        assert!(weapon.try_fire(100.0, 300.0, -1.0));
        weapon.clear();
        assert_eq!(weapon.active_count(), 0);
        assert!(!weapon.can_fire());
        assert!(!weapon.try_fire(100.0, 300.0, -1.0));
        weapon.update(200.0);
        assert!(weapon.try_fire(100.0, 300.0, -1.0));
    }

    #[test]
    fn sustained_fire_never_grows_the_pool() {
        let mut weapon = weapon(50.0, 4);
        for _ in 0..600 {
            weapon.try_fire(400.0, 300.0, -1.0);
            weapon.update(16.0);
            assert_eq!(weapon.active_count() + weapon.free_count(), 4);
        }
    }
}

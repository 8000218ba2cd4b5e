use std::collections::HashMap;

use crate::{
    client::{Client, ClientId},
    geometry::Rectangle,
    monitor::{Monitor, MonitorDefaults},
    tag::TagSet,
    xconnection::Xid,
};

/// Owner of every managed client and every monitor.
///
/// Clients live in an arena keyed by `ClientId`. Each monitor keeps two
/// orderings of the ids it owns: insertion order (`clients`) and focus order
/// (`stack`).
#[derive(Debug)]
pub struct Registry {
    clients: HashMap<ClientId, Client>,
    pub monitors: Vec<Monitor>,
    pub selmon: usize,
    next_id: u64,
}

impl Registry {
    pub fn new(monitors: Vec<Monitor>) -> Registry {
        Registry {
            clients: HashMap::new(),
            monitors,
            selmon: 0,
            next_id: 0,
        }
    }

    /// Take ownership of a client without placing it in any list.
    pub fn insert(&mut self, c: Client) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.clients.insert(id, c);
        id
    }

    /// Drop a client from the arena, detaching it from both lists first.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        self.detach(id);
        self.detach_stack(id);
        self.clients.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn selmon(&self) -> &Monitor {
        &self.monitors[self.selmon]
    }

    pub fn selmon_mut(&mut self) -> &mut Monitor {
        &mut self.monitors[self.selmon]
    }

    /// Focused client of the selected monitor
    pub fn sel(&self) -> Option<ClientId> {
        self.selmon().sel
    }

    fn mon_of(&self, id: ClientId) -> Option<usize> {
        self.clients.get(&id).map(|c| c.mon)
    }

    /// Insert at the head of the owning monitor's client list.
    pub fn attach(&mut self, id: ClientId) {
        if let Some(m) = self.mon_of(id) {
            let list = &mut self.monitors[m].clients;
            debug_assert!(!list.contains(&id), "double attach of {:?}", id);
            list.insert(0, id);
        }
    }

    /// Remove from the owning monitor's client list. Absent ids are ignored.
    pub fn detach(&mut self, id: ClientId) {
        if let Some(m) = self.mon_of(id) {
            self.monitors[m].clients.retain(|&c| c != id);
        }
    }

    /// Insert at the head of the owning monitor's focus stack.
    pub fn attach_stack(&mut self, id: ClientId) {
        if let Some(m) = self.mon_of(id) {
            let stack = &mut self.monitors[m].stack;
            debug_assert!(!stack.contains(&id), "double stack attach of {:?}", id);
            stack.insert(0, id);
        }
    }

    /// Remove from the focus stack, moving the selection to the first visible
    /// client left in stack order if `id` was selected.
    pub fn detach_stack(&mut self, id: ClientId) {
        let m = match self.mon_of(id) {
            Some(m) => m,
            None => return,
        };
        self.monitors[m].stack.retain(|&c| c != id);
        if self.monitors[m].sel == Some(id) {
            let next = self.monitors[m]
                .stack
                .iter()
                .copied()
                .find(|&c| self.is_visible(c));
            self.monitors[m].sel = next;
        }
    }

    /// Shown on its monitor's current tag view
    pub fn is_visible(&self, id: ClientId) -> bool {
        self.clients
            .get(&id)
            .map_or(false, |c| c.tags.intersects(self.monitors[c.mon].tagset()))
    }

    pub fn win_to_client(&self, win: Xid) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| c.win == win)
            .map(|(&id, _)| id)
    }

    /// The client whose swallowed terminal owns `win`
    pub fn swallowing_client(&self, win: Xid) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, c)| c.swallowed.as_ref().map_or(false, |s| s.win == win))
            .map(|(&id, _)| id)
    }

    /// Visible, non-floating clients of `mon` in client-list order.
    pub fn tiled(&self, mon: usize) -> Vec<ClientId> {
        self.monitors[mon]
            .clients
            .iter()
            .copied()
            .filter(|&id| self.is_visible(id) && self.clients.get(&id).map_or(false, |c| !c.floating))
            .collect()
    }

    /// Visible clients of `mon` in client-list order.
    pub fn visible(&self, mon: usize) -> Vec<ClientId> {
        self.monitors[mon]
            .clients
            .iter()
            .copied()
            .filter(|&id| self.is_visible(id))
            .collect()
    }

    /// Tags with at least one client, and tags with an urgent client.
    pub fn occupied_tags(&self, mon: usize) -> (TagSet, TagSet) {
        let mut occupied = TagSet::EMPTY;
        let mut urgent = TagSet::EMPTY;
        for c in self.monitors[mon].clients.iter().filter_map(|id| self.clients.get(id)) {
            occupied |= c.tags;
            if c.urgent {
                urgent |= c.tags;
            }
        }
        (occupied, urgent)
    }

    /// Every managed client, monitor by monitor in attach order.
    pub fn managed(&self) -> Vec<ClientId> {
        self.monitors.iter().flat_map(|m| m.clients.iter().copied()).collect()
    }

    /// Window ids of every managed client, for _NET_CLIENT_LIST.
    pub fn windows(&self) -> Vec<Xid> {
        self.monitors
            .iter()
            .flat_map(|m| m.clients.iter())
            .filter_map(|id| self.clients.get(id))
            .map(|c| c.win)
            .collect()
    }

    /// Monitor with the largest overlap with `r`, the selected one if none overlap.
    pub fn rect_to_mon(&self, r: Rectangle) -> usize {
        let mut best = (self.selmon, 0);
        for (i, m) in self.monitors.iter().enumerate() {
            let area = m.work.intersect_area(&r);
            if area > best.1 {
                best = (i, area);
            }
        }
        best.0
    }

    /// Neighbouring monitor index, wrapping in both directions.
    pub fn dir_to_mon(&self, dir: i32) -> usize {
        let n = self.monitors.len() as i32;
        ((self.selmon as i32 + dir).rem_euclid(n)) as usize
    }

    /// Hand a client to another monitor: it adopts that monitor's current tags.
    pub fn send_to_monitor(&mut self, id: ClientId, target: usize) {
        if self.mon_of(id) == Some(target) {
            return;
        }
        self.detach(id);
        self.detach_stack(id);
        let tags = self.monitors[target].tagset();
        if let Some(c) = self.clients.get_mut(&id) {
            c.mon = target;
            c.tags = tags;
        }
        self.attach(id);
        self.attach_stack(id);
    }

    /// Make the monitor list match `regions`.
    ///
    /// Existing monitors are updated in place, new regions get fresh monitors
    /// and monitors whose region vanished hand their clients to monitor 0.
    /// Returns whether anything changed, along with the bar windows of the
    /// removed monitors.
    pub fn reconcile_monitors(
        &mut self,
        regions: &[Rectangle],
        defaults: &MonitorDefaults,
        bar_height: u32,
    ) -> (bool, Vec<Xid>) {
        let mut unique: Vec<Rectangle> = Vec::with_capacity(regions.len());
        for r in regions {
            if !unique.contains(r) {
                unique.push(*r);
            }
        }
        if unique.is_empty() {
            return (false, vec![]);
        }

        let mut dirty = false;
        for (i, r) in unique.iter().enumerate() {
            if i >= self.monitors.len() {
                info!("adding monitor {} at {:?}", i, r);
                self.monitors.push(Monitor::new(i, *r, defaults, bar_height));
                dirty = true;
            } else if self.monitors[i].screen != *r {
                info!("monitor {} moved to {:?}", i, r);
                let m = &mut self.monitors[i];
                m.screen = *r;
                m.update_bar_pos(bar_height);
                dirty = true;
            }
        }

        let mut removed_bars = vec![];
        while self.monitors.len() > unique.len() {
            let gone = self.monitors.len() - 1;
            info!("removing monitor {}", gone);
            let ids: Vec<ClientId> = self.monitors[gone].clients.clone();
            for id in ids.into_iter().rev() {
                self.detach(id);
                self.detach_stack(id);
                if let Some(c) = self.clients.get_mut(&id) {
                    c.mon = 0;
                }
                self.attach(id);
                self.attach_stack(id);
            }
            if let Some(m) = self.monitors.pop() {
                removed_bars.extend(m.bar_win);
            }
            if self.selmon == gone {
                self.selmon = 0;
            }
            dirty = true;
        }

        (dirty, removed_bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, LayoutKind};

    fn defaults() -> MonitorDefaults {
        MonitorDefaults {
            mfact: 0.5,
            nmaster: 1,
            show_bar: true,
            top_bar: true,
            layouts: [
                Layout::new("[]=", LayoutKind::Tile),
                Layout::new("><>", LayoutKind::Floating),
            ],
        }
    }

    fn registry() -> Registry {
        Registry::new(vec![Monitor::new(0, Rectangle::new(0, 0, 1000, 800), &defaults(), 20)])
    }

    fn add(reg: &mut Registry, win: Xid, tags: TagSet) -> ClientId {
        let mut c = Client::new(win, Rectangle::new(0, 0, 100, 100), 0);
        c.tags = tags;
        c.mon = reg.selmon;
        let id = reg.insert(c);
        reg.attach(id);
        reg.attach_stack(id);
        id
    }

    #[test]
    fn attach_puts_client_at_the_head() {
        let mut reg = registry();
        let a = add(&mut reg, 1, TagSet::single(0));
        let b = add(&mut reg, 2, TagSet::single(0));
        assert_eq!(reg.monitors[0].clients, vec![b, a]);
    }

    #[test]
    fn attach_then_detach_leaves_list_unchanged() {
        let mut reg = registry();
        let a = add(&mut reg, 1, TagSet::single(0));
        let b = add(&mut reg, 2, TagSet::single(0));
        let before = reg.monitors[0].clients.clone();

        let c = reg.insert(Client::new(3, Rectangle::default(), 0));
        reg.attach(c);
        reg.detach(c);

        assert_eq!(reg.monitors[0].clients, before);
        assert_eq!(before, vec![b, a]);
    }

    #[test]
    fn detach_of_absent_client_is_a_no_op() {
        let mut reg = registry();
        let a = add(&mut reg, 1, TagSet::single(0));
        let stray = reg.insert(Client::new(9, Rectangle::default(), 0));
        reg.detach(stray);
        reg.detach_stack(stray);
        assert_eq!(reg.monitors[0].clients, vec![a]);
    }

    #[test]
    fn removing_selection_selects_next_visible_in_stack_order() {
        let mut reg = registry();
        let a = add(&mut reg, 1, TagSet::single(0));
        let _hidden = add(&mut reg, 2, TagSet::single(5));
        let c = add(&mut reg, 3, TagSet::single(0));
        reg.monitors[0].sel = Some(c);

        reg.detach_stack(c);
        assert_eq!(reg.monitors[0].sel, Some(a));

        reg.detach_stack(a);
        assert_eq!(reg.monitors[0].sel, None);
    }

    #[test]
    fn tiled_skips_floating_and_hidden() {
        let mut reg = registry();
        let a = add(&mut reg, 1, TagSet::single(0));
        let f = add(&mut reg, 2, TagSet::single(0));
        let _h = add(&mut reg, 3, TagSet::single(1));
        if let Some(c) = reg.get_mut(f) {
            c.floating = true;
        }
        assert_eq!(reg.tiled(0), vec![a]);
    }

    #[test]
    fn sticky_clients_are_always_visible() {
        let mut reg = registry();
        let s = add(&mut reg, 1, TagSet::from_bits(!0));
        reg.monitors[0].view(TagSet::single(7), TagSet::mask(10));
        assert!(reg.is_visible(s));
    }

    #[test]
    fn removed_monitor_hands_clients_to_first() {
        let mut reg = registry();
        let regions = [Rectangle::new(0, 0, 1000, 800), Rectangle::new(1000, 0, 1000, 800)];
        let (dirty, _) = reg.reconcile_monitors(&regions, &defaults(), 20);
        assert!(dirty);
        assert_eq!(reg.monitors.len(), 2);

        reg.selmon = 1;
        let id = add(&mut reg, 7, TagSet::single(0));
        assert_eq!(reg.get(id).map(|c| c.mon), Some(1));
        reg.monitors[1].bar_win = Some(99);

        let (dirty, bars) = reg.reconcile_monitors(&regions[..1], &defaults(), 20);
        assert!(dirty);
        assert_eq!(bars, vec![99]);
        assert_eq!(reg.monitors.len(), 1);
        assert_eq!(reg.selmon, 0);
        assert_eq!(reg.monitors[0].clients, vec![id]);
        assert_eq!(reg.monitors[0].stack, vec![id]);
    }

    #[test]
    fn duplicate_regions_collapse() {
        let mut reg = registry();
        let r = Rectangle::new(0, 0, 1000, 800);
        let (dirty, _) = reg.reconcile_monitors(&[r, r], &defaults(), 20);
        assert!(!dirty);
        assert_eq!(reg.monitors.len(), 1);
    }
}

use bimap::BiMap;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::{self, distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use std::{collections::BTreeMap, fs::File};
use uuid::Uuid;

use super::{
    attendance::{check_geofence, check_window},
    lifecycle::{apply_lifecycle, common_availability},
    password::{hash_password, verify_password},
    seed::seed_db,
    username_from_name, ApprovalOverride, Database, DbError, Decision, ManualAttendance, NewRoom,
    NewSchedule, NewSeminar, NewUser, RevisionValidation, RoomUpdate, Scan, UpdateStatus,
    DEFAULT_ROOM_RADIUS, PAGE_SIZE,
};
use crate::models::{
    Approval, ApprovalStatus, Attendance, AttendanceMethod, Cancellation, RevisionItem,
    RevisionStatus, Room, Schedule, ScheduleStatus, Seminar, SeminarStatus, User,
};

#[derive(Serialize, Deserialize)]
pub struct JSONDatabase {
    #[serde(skip)]
    filename: Option<String>,
    users: BTreeMap<u32, User>,
    tokens: BiMap<String, u32>,
    rooms: BTreeMap<u32, Room>,
    seminars: BTreeMap<u32, Seminar>,
    approvals: BTreeMap<u32, Approval>,
    schedules: BTreeMap<u32, Schedule>,
    attendances: BTreeMap<u32, Attendance>,
    revisions: BTreeMap<u32, RevisionItem>,
    next_user_id: u32,
    next_room_id: u32,
    next_seminar_id: u32,
    next_approval_id: u32,
    next_schedule_id: u32,
    next_attendance_id: u32,
    next_revision_id: u32,
}

impl JSONDatabase {
    pub fn new(filename: String) -> Result<Self, DbError> {
        // Try to read from disk, refusing to overwrite a file we cannot parse
        if Path::new(&filename).exists() {
            let mut db = Self::from_file(&filename)?;
            db.filename = Some(filename);
            return Ok(db);
        }

        log::info!("{} does not exist, seeding a new database", filename);

        let mut db = Self::empty(Some(filename));
        db.reset()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, DbError> {
        let mut db = Self::empty(None);
        db.reset()?;
        Ok(db)
    }

    fn empty(filename: Option<String>) -> Self {
        Self {
            filename,
            users: BTreeMap::new(),
            tokens: BiMap::new(),
            rooms: BTreeMap::new(),
            seminars: BTreeMap::new(),
            approvals: BTreeMap::new(),
            schedules: BTreeMap::new(),
            attendances: BTreeMap::new(),
            revisions: BTreeMap::new(),
            next_user_id: 0,
            next_room_id: 0,
            next_seminar_id: 0,
            next_approval_id: 0,
            next_schedule_id: 0,
            next_attendance_id: 0,
            next_revision_id: 0,
        }
    }

    fn from_file(filename: &str) -> Result<Self, DbError> {
        let contents = {
            let mut file = File::open(filename)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            contents
        };

        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self) -> Result<(), DbError> {
        if let Some(filename) = &self.filename {
            let mut output = File::create(filename)?;
            write!(output, "{}", self.dump_as_json()?)?;
        }
        Ok(())
    }
}

impl Database for JSONDatabase {
    fn reset(&mut self) -> Result<(), DbError> {
        let filename = self.filename.take();
        *self = Self::empty(filename);

        seed_db(self)?;

        self.persist()
    }

    fn seed(
        &mut self,
        users: impl Iterator<Item = NewUser>,
        rooms: impl Iterator<Item = NewRoom>,
    ) -> Result<(), DbError> {
        for room in rooms {
            self._room_add(room)?;
        }
        for user in users {
            self._user_add(user)?;
        }
        self.persist()
    }

    fn dump_as_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }

    fn auth_login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Option<(&User, String)>, DbError> {
        let user = match self.users.values().find(|u| u.username == username) {
            Some(user) => user,
            None => return Ok(None),
        };

        if !verify_password(password, &user.password) {
            return Ok(None);
        }

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(25)
            .map(char::from)
            .collect();

        self.tokens.insert(token.clone(), user.id);
        self.persist()?;
        Ok(Some((user, token)))
    }

    fn auth_logout(&mut self, token: &str) -> Result<bool, DbError> {
        let removed = self.tokens.remove_by_left(token).is_some();
        self.persist()?;
        Ok(removed)
    }

    fn auth_get_user(&self, token: &str) -> Option<&User> {
        let id = self.tokens.get_by_left(token)?;
        self.users.get(id)
    }

    fn user_add(&mut self, user: NewUser) -> Result<&User, DbError> {
        let id = self._user_add(user)?;
        self.persist()?;
        Ok(&self.users[&id])
    }

    fn user_get(&self, id: u32) -> Option<&User> {
        self.users.get(&id)
    }

    fn user_get_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username == username)
    }

    fn user_set_password(&mut self, id: u32, password: &str) -> Result<(), DbError> {
        let hash = hash_password(password).map_err(|e| DbError::Hash(e.to_string()))?;
        let user = self.users.get_mut(&id).ok_or(DbError::NotFound("user"))?;
        user.password = hash;
        self.persist()
    }

    fn user_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&User) -> bool,
    ) -> (usize, Vec<&User>) {
        _search(
            self.users.values(),
            |u: &User| u.full_name(),
            page,
            query,
            filter,
        )
    }

    fn user_remove(&mut self, users: &[u32]) -> Result<(), DbError> {
        // Check first that all IDS exist
        if !users.iter().all(|id| self.users.contains_key(id)) {
            return Err(DbError::NotFound("user"));
        }

        let referenced = users.iter().any(|id| {
            self.seminars.values().any(|s| s.involves(*id))
                || self.attendances.values().any(|a| a.attendee_id == *id)
        });

        if referenced {
            return Err(DbError::InUse("user"));
        }

        for id in users {
            self.tokens.remove_by_right(id);
            self.users.remove(id);
        }

        self.persist()
    }

    fn room_list(&self, page: Option<usize>, query: Option<&str>) -> (usize, Vec<&Room>) {
        _search(
            self.rooms.values(),
            |r: &Room| r.name.to_string(),
            page,
            query,
            |_| true,
        )
    }

    fn room_get(&self, id: u32) -> Option<&Room> {
        self.rooms.get(&id)
    }

    fn room_add(&mut self, room: NewRoom) -> Result<&Room, DbError> {
        let id = self._room_add(room)?;
        self.persist()?;
        Ok(&self.rooms[&id])
    }

    fn room_update(&mut self, id: u32, update: RoomUpdate) -> Result<UpdateStatus, DbError> {
        let room = match self.rooms.get_mut(&id) {
            Some(room) => room,
            None => {
                return Ok(UpdateStatus {
                    found: false,
                    updated: false,
                })
            }
        };

        if update.radius_meters.map_or(false, |r| r <= 0.0) {
            return Err(DbError::Invalid("radius must be positive"));
        }

        let mut updated = false;

        if let Some(name) = update.name {
            room.name = name;
            updated = true;
        }

        if let Some(capacity) = update.capacity {
            room.capacity = capacity;
            updated = true;
        }

        if let Some(location) = update.location {
            room.location = location;
            updated = true;
        }

        if let Some(radius) = update.radius_meters {
            room.radius_meters = radius;
            updated = true;
        }

        if updated {
            self.persist()?;
        }

        Ok(UpdateStatus {
            found: true,
            updated,
        })
    }

    fn room_remove(&mut self, rooms: &[u32]) -> Result<(), DbError> {
        // Check first
        if !rooms.iter().all(|id| self.rooms.contains_key(id)) {
            return Err(DbError::NotFound("room"));
        }

        if self.schedules.values().any(|s| rooms.contains(&s.room_id)) {
            return Err(DbError::InUse("room"));
        }

        rooms.iter().for_each(|id| {
            self.rooms.remove(id);
        });

        self.persist()
    }

    fn seminar_add(
        &mut self,
        student_id: u32,
        seminar: NewSeminar,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError> {
        if self.user_get_student(student_id).is_none() {
            return Err(DbError::NotAllowed("seminar"));
        }

        if seminar.title.trim().is_empty() {
            return Err(DbError::Invalid("title is empty"));
        }

        let lecturers = [
            seminar.advisor1_id,
            seminar.advisor2_id,
            seminar.examiner_id,
        ];
        let distinct = lecturers[0] != lecturers[1]
            && lecturers[0] != lecturers[2]
            && lecturers[1] != lecturers[2];

        if !distinct || lecturers.iter().any(|id| self.user_get_lecturer(*id).is_none()) {
            return Err(DbError::InvalidAssignment);
        }

        let id = self.next_seminar_id;
        self.next_seminar_id += 1;

        let seminar = Seminar {
            id,
            student_id,
            advisor1_id: seminar.advisor1_id,
            advisor2_id: seminar.advisor2_id,
            examiner_id: seminar.examiner_id,
            title: seminar.title,
            seminar_type: seminar.seminar_type,
            abstract_text: seminar.abstract_text,
            status: if seminar.draft {
                SeminarStatus::Draft
            } else {
                SeminarStatus::PendingVerification
            },
            created_at: now,
            approved_at: None,
            verified_at: None,
            verified_by: None,
            cancellation: None,
        };

        // One approval record per role, for the whole life of the seminar
        for (role, lecturer_id) in seminar.lecturers() {
            let approval_id = self.next_approval_id;
            self.next_approval_id += 1;

            self.approvals.insert(
                approval_id,
                Approval {
                    id: approval_id,
                    seminar_id: id,
                    lecturer_id,
                    role,
                    status: ApprovalStatus::Pending,
                    available_dates: Vec::new(),
                    comment: None,
                    decided_at: None,
                },
            );
        }

        log::info!(
            "seminar {} created by student {} ({})",
            id,
            student_id,
            seminar.status.as_str()
        );

        self.seminars.insert(id, seminar);
        self.persist()?;
        Ok(&self.seminars[&id])
    }

    fn seminar_get(&self, id: u32) -> Option<&Seminar> {
        self.seminars.get(&id)
    }

    fn seminar_list(
        &self,
        page: Option<usize>,
        query: Option<&str>,
        filter: impl Fn(&Seminar) -> bool,
    ) -> (usize, Vec<&Seminar>) {
        _search(
            self.seminars.values(),
            |s: &Seminar| s.title.to_string(),
            page,
            query,
            filter,
        )
    }

    fn seminar_submit(&mut self, id: u32, student_id: u32) -> Result<&Seminar, DbError> {
        let seminar = self
            .seminars
            .get_mut(&id)
            .ok_or(DbError::NotFound("seminar"))?;

        if seminar.student_id != student_id {
            return Err(DbError::NotAllowed("seminar"));
        }

        if seminar.status != SeminarStatus::Draft {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        seminar.status = SeminarStatus::PendingVerification;
        log::info!("seminar {} submitted", id);

        self.persist()?;
        Ok(&self.seminars[&id])
    }

    fn seminar_approvals(&self, id: u32) -> Vec<&Approval> {
        self.approvals
            .values()
            .filter(|a| a.seminar_id == id)
            .collect()
    }

    fn seminar_availability(&self, id: u32) -> Result<Vec<NaiveDate>, DbError> {
        if !self.seminars.contains_key(&id) {
            return Err(DbError::NotFound("seminar"));
        }

        Ok(common_availability(&self.seminar_approvals(id)))
    }

    fn seminar_verify(
        &mut self,
        id: u32,
        admin_id: u32,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError> {
        let seminar = self
            .seminars
            .get_mut(&id)
            .ok_or(DbError::NotFound("seminar"))?;

        if seminar.status != SeminarStatus::Approved {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        if seminar.verified_at.is_some() {
            return Err(DbError::AlreadyVerified);
        }

        seminar.verified_at = Some(now);
        seminar.verified_by = Some(admin_id);
        log::info!("seminar {} verified by {}", id, admin_id);

        self.persist()?;
        Ok(&self.seminars[&id])
    }

    fn seminar_schedule(&mut self, id: u32, schedule: NewSchedule) -> Result<&Schedule, DbError> {
        let seminar = self
            .seminars
            .get(&id)
            .ok_or(DbError::NotFound("seminar"))?;

        if seminar.status == SeminarStatus::Scheduled || self.schedule_get_by_seminar(id).is_some()
        {
            return Err(DbError::AlreadyScheduled);
        }

        if seminar.status != SeminarStatus::Approved {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        if seminar.verified_at.is_none() {
            return Err(DbError::NotVerified);
        }

        if schedule.duration_minutes == 0 {
            return Err(DbError::Invalid("duration must be positive"));
        }

        if self.room_get(schedule.room_id).is_none() {
            return Err(DbError::NotFound("room"));
        }

        if !self.seminar_availability(id)?.contains(&schedule.date) {
            return Err(DbError::DateNotAvailable(schedule.date));
        }

        let start = Utc.from_utc_datetime(&schedule.date.and_time(schedule.start_time));
        let end = start + Duration::minutes(i64::from(schedule.duration_minutes));

        let occupied = self.schedules.values().any(|s| {
            s.room_id == schedule.room_id && s.status == ScheduleStatus::Planned && s.overlaps(start, end)
        });

        if occupied {
            return Err(DbError::RoomOccupied);
        }

        let schedule_id = self.next_schedule_id;
        self.next_schedule_id += 1;

        self.schedules.insert(
            schedule_id,
            Schedule {
                id: schedule_id,
                seminar_id: id,
                room_id: schedule.room_id,
                start,
                duration_minutes: schedule.duration_minutes,
                status: ScheduleStatus::Planned,
                token: Uuid::new_v4(),
            },
        );

        if let Some(seminar) = self.seminars.get_mut(&id) {
            seminar.status = SeminarStatus::Scheduled;
        }

        log::info!(
            "seminar {} scheduled in room {} at {}",
            id,
            schedule.room_id,
            start
        );

        self.persist()?;
        Ok(&self.schedules[&schedule_id])
    }

    fn seminar_finish(&mut self, id: u32) -> Result<&Seminar, DbError> {
        let seminar = self
            .seminars
            .get_mut(&id)
            .ok_or(DbError::NotFound("seminar"))?;

        if seminar.status != SeminarStatus::Scheduled {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        seminar.status = SeminarStatus::Finished;

        self.schedules
            .values_mut()
            .filter(|s| s.seminar_id == id)
            .for_each(|s| s.status = ScheduleStatus::Finished);

        log::info!("seminar {} finished", id);

        self.persist()?;
        Ok(&self.seminars[&id])
    }

    fn seminar_cancel(
        &mut self,
        id: u32,
        actor_id: u32,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<&Seminar, DbError> {
        let actor_is_administrator = self
            .users
            .get(&actor_id)
            .map_or(false, |u| u.kind.is_administrator());

        let seminar = self
            .seminars
            .get_mut(&id)
            .ok_or(DbError::NotFound("seminar"))?;

        if seminar.student_id != actor_id && !actor_is_administrator {
            return Err(DbError::NotAllowed("seminar"));
        }

        if matches!(
            seminar.status,
            SeminarStatus::Finished | SeminarStatus::Cancelled
        ) {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        if reason.trim().is_empty() {
            return Err(DbError::Invalid("a cancellation needs a reason"));
        }

        seminar.status = SeminarStatus::Cancelled;
        seminar.cancellation = Some(Cancellation {
            cancelled_at: now,
            reason,
            cancelled_by: actor_id,
        });

        let removed: Vec<u32> = self
            .schedules
            .values()
            .filter(|s| s.seminar_id == id)
            .map(|s| s.id)
            .collect();

        self.schedules.retain(|_, s| s.seminar_id != id);
        self.attendances
            .retain(|_, a| !removed.contains(&a.schedule_id));

        log::info!("seminar {} cancelled by {}", id, actor_id);

        self.persist()?;
        Ok(&self.seminars[&id])
    }

    fn approval_get(&self, id: u32) -> Option<&Approval> {
        self.approvals.get(&id)
    }

    fn approval_list(&self, lecturer_id: u32) -> Vec<&Approval> {
        self.approvals
            .values()
            .filter(|a| a.lecturer_id == lecturer_id)
            .collect()
    }

    fn approval_decide(
        &mut self,
        seminar_id: u32,
        lecturer_id: u32,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<SeminarStatus, DbError> {
        let seminar = self
            .seminars
            .get(&seminar_id)
            .ok_or(DbError::NotFound("seminar"))?;

        if !seminar.is_assigned(lecturer_id) {
            return Err(DbError::NotAllowed("seminar"));
        }

        let seminar_status = seminar.status;

        let approval = self
            .approvals
            .values_mut()
            .find(|a| a.seminar_id == seminar_id && a.lecturer_id == lecturer_id)
            .ok_or(DbError::NotFound("approval"))?;

        if approval.status != ApprovalStatus::Pending {
            return Err(DbError::AlreadyDecided);
        }

        if seminar_status != SeminarStatus::PendingVerification {
            return Err(DbError::SeminarStatus(seminar_status));
        }

        match decision {
            Decision::Approve {
                mut available_dates,
                comment,
            } => {
                if available_dates.is_empty() {
                    return Err(DbError::Invalid("at least one available date is required"));
                }

                available_dates.sort();
                available_dates.dedup();

                approval.status = ApprovalStatus::Approved;
                approval.available_dates = available_dates;
                approval.comment = comment;
            }
            Decision::Reject { comment } => {
                if comment.trim().is_empty() {
                    return Err(DbError::Invalid("a rejection needs a comment"));
                }

                approval.status = ApprovalStatus::Rejected;
                approval.available_dates.clear();
                approval.comment = Some(comment);
            }
        }

        approval.decided_at = Some(now);
        log::info!(
            "lecturer {} {:?} seminar {}",
            lecturer_id,
            approval.status,
            seminar_id
        );

        let status = self._aggregate(seminar_id, now)?;
        self.persist()?;
        Ok(status)
    }

    fn approval_override(
        &mut self,
        id: u32,
        update: ApprovalOverride,
        now: DateTime<Utc>,
    ) -> Result<SeminarStatus, DbError> {
        let approval = self
            .approvals
            .get_mut(&id)
            .ok_or(DbError::NotFound("approval"))?;
        let seminar = self
            .seminars
            .get(&approval.seminar_id)
            .ok_or(DbError::NotFound("seminar"))?;

        match seminar.status {
            SeminarStatus::PendingVerification
            | SeminarStatus::NeedsRevision
            | SeminarStatus::Approved => {}
            other => return Err(DbError::SeminarStatus(other)),
        }

        if update.status == ApprovalStatus::Approved && update.available_dates.is_empty() {
            return Err(DbError::Invalid("at least one available date is required"));
        }

        let mut available_dates = update.available_dates;
        available_dates.sort();
        available_dates.dedup();

        approval.status = update.status;
        approval.comment = update.comment;
        approval.decided_at = match update.status {
            ApprovalStatus::Pending => None,
            ApprovalStatus::Approved | ApprovalStatus::Rejected => Some(now),
        };
        approval.available_dates = match update.status {
            ApprovalStatus::Approved => available_dates,
            ApprovalStatus::Pending | ApprovalStatus::Rejected => Vec::new(),
        };

        let seminar_id = approval.seminar_id;
        log::warn!("approval {} overridden to {:?}", id, update.status);

        let status = self._aggregate(seminar_id, now)?;
        self.persist()?;
        Ok(status)
    }

    fn schedule_get(&self, id: u32) -> Option<&Schedule> {
        self.schedules.get(&id)
    }

    fn schedule_get_by_seminar(&self, seminar_id: u32) -> Option<&Schedule> {
        self.schedules.values().find(|s| s.seminar_id == seminar_id)
    }

    fn schedule_regenerate_token(&mut self, id: u32) -> Result<&Schedule, DbError> {
        let schedule = self
            .schedules
            .get_mut(&id)
            .ok_or(DbError::NotFound("schedule"))?;

        if schedule.status != ScheduleStatus::Planned {
            return Err(DbError::Invalid("the schedule is already finished"));
        }

        schedule.token = Uuid::new_v4();
        log::info!("token of schedule {} regenerated", id);

        self.persist()?;
        Ok(&self.schedules[&id])
    }

    fn attendance_scan(
        &mut self,
        attendee_id: u32,
        scan: Scan,
        now: DateTime<Utc>,
    ) -> Result<&Attendance, DbError> {
        let schedule = self
            .schedules
            .values()
            .find(|s| s.token == scan.token)
            .ok_or(DbError::NotFound("schedule"))?;

        if schedule.status != ScheduleStatus::Planned {
            return Err(DbError::Invalid("the seminar is already finished"));
        }

        if self._attended(schedule.id, attendee_id) {
            return Err(DbError::AlreadyRecorded);
        }

        let lateness = check_window(schedule.start, schedule.duration_minutes, now)?;

        let room = self.rooms.get(&schedule.room_id);
        let claimed = scan.location();
        let override_reason = scan.override_reason.filter(|r| !r.trim().is_empty());

        let distance_meters = check_geofence(
            claimed,
            room.and_then(|r| r.location),
            room.map_or(DEFAULT_ROOM_RADIUS, |r| r.radius_meters),
            override_reason.as_deref(),
        )?;

        let attendance = Attendance {
            id: self.next_attendance_id,
            schedule_id: schedule.id,
            attendee_id,
            recorded_at: now,
            method: AttendanceMethod::QrScan,
            lateness: Some(lateness),
            distance_meters,
            override_reason,
        };

        let id = self._attendance_insert(attendance);
        self.persist()?;
        Ok(&self.attendances[&id])
    }

    fn attendance_manual(
        &mut self,
        schedule_id: u32,
        entry: ManualAttendance,
        now: DateTime<Utc>,
    ) -> Result<&Attendance, DbError> {
        let schedule = self
            .schedules
            .get(&schedule_id)
            .ok_or(DbError::NotFound("schedule"))?;

        if !self.users.contains_key(&entry.attendee_id) {
            return Err(DbError::NotFound("user"));
        }

        if self._attended(schedule_id, entry.attendee_id) {
            return Err(DbError::AlreadyRecorded);
        }

        let attendance = Attendance {
            id: self.next_attendance_id,
            schedule_id,
            attendee_id: entry.attendee_id,
            recorded_at: now,
            method: AttendanceMethod::Manual,
            // Entries made outside the window carry no lateness
            lateness: check_window(schedule.start, schedule.duration_minutes, now).ok(),
            distance_meters: None,
            override_reason: entry.reason.filter(|r| !r.trim().is_empty()),
        };

        let id = self._attendance_insert(attendance);
        self.persist()?;
        Ok(&self.attendances[&id])
    }

    fn attendance_list(&self, schedule_id: u32) -> Vec<&Attendance> {
        self.attendances
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .collect()
    }

    fn revision_add(
        &mut self,
        seminar_id: u32,
        lecturer_id: u32,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError> {
        let seminar = self
            .seminars
            .get(&seminar_id)
            .ok_or(DbError::NotFound("seminar"))?;

        if !seminar.is_assigned(lecturer_id) {
            return Err(DbError::NotAllowed("seminar"));
        }

        if seminar.status != SeminarStatus::Finished {
            return Err(DbError::SeminarStatus(seminar.status));
        }

        if description.trim().is_empty() {
            return Err(DbError::Invalid("description is empty"));
        }

        let id = self.next_revision_id;
        self.next_revision_id += 1;

        self.revisions.insert(
            id,
            RevisionItem {
                id,
                seminar_id,
                lecturer_id,
                description,
                status: RevisionStatus::Open,
                student_response: None,
                lecturer_note: None,
                created_at: now,
                submitted_at: None,
                validated_at: None,
            },
        );

        self.persist()?;
        Ok(&self.revisions[&id])
    }

    fn revision_get(&self, id: u32) -> Option<&RevisionItem> {
        self.revisions.get(&id)
    }

    fn revision_list(&self, seminar_id: u32) -> Vec<&RevisionItem> {
        self.revisions
            .values()
            .filter(|r| r.seminar_id == seminar_id)
            .collect()
    }

    fn revision_submit(
        &mut self,
        id: u32,
        student_id: u32,
        response: String,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError> {
        let item = self
            .revisions
            .get_mut(&id)
            .ok_or(DbError::NotFound("revision item"))?;

        let owner = self.seminars.get(&item.seminar_id).map(|s| s.student_id);

        if owner != Some(student_id) {
            return Err(DbError::NotAllowed("revision item"));
        }

        if item.status != RevisionStatus::Open {
            return Err(DbError::RevisionStatus(item.status));
        }

        if response.trim().is_empty() {
            return Err(DbError::Invalid("response is empty"));
        }

        item.status = RevisionStatus::Submitted;
        item.student_response = Some(response);
        item.submitted_at = Some(now);

        self.persist()?;
        Ok(&self.revisions[&id])
    }

    fn revision_validate(
        &mut self,
        id: u32,
        lecturer_id: u32,
        validation: RevisionValidation,
        now: DateTime<Utc>,
    ) -> Result<&RevisionItem, DbError> {
        let item = self
            .revisions
            .get_mut(&id)
            .ok_or(DbError::NotFound("revision item"))?;

        // Only the lecturer who asked for the revision may validate it
        if item.lecturer_id != lecturer_id {
            return Err(DbError::NotAllowed("revision item"));
        }

        if item.status != RevisionStatus::Submitted {
            return Err(DbError::RevisionStatus(item.status));
        }

        if validation.note.is_some() {
            item.lecturer_note = validation.note;
        }

        if validation.accepted {
            item.status = RevisionStatus::Validated;
            item.validated_at = Some(now);
        } else {
            item.status = RevisionStatus::Open;
        }

        self.persist()?;
        Ok(&self.revisions[&id])
    }
}

impl JSONDatabase {
    fn _user_add(&mut self, user: NewUser) -> Result<u32, DbError> {
        let base = username_from_name(&user.first_name, &user.last_name);
        let mut username = base.clone();
        let mut suffix = 2;

        while self.user_get_by_username(&username).is_some() {
            username = format!("{}{}", base, suffix);
            suffix += 1;
        }

        let password = hash_password(&user.password).map_err(|e| DbError::Hash(e.to_string()))?;
        let id = self.next_user_id;

        self.users.insert(
            id,
            User {
                id,
                first_name: user.first_name,
                last_name: user.last_name,
                username,
                password,
                kind: user.kind,
            },
        );

        self.next_user_id += 1;
        Ok(id)
    }

    fn _room_add(&mut self, room: NewRoom) -> Result<u32, DbError> {
        if room.name.trim().is_empty() {
            return Err(DbError::Invalid("room name is empty"));
        }

        let radius_meters = room.radius_meters.unwrap_or(DEFAULT_ROOM_RADIUS);

        if radius_meters <= 0.0 {
            return Err(DbError::Invalid("radius must be positive"));
        }

        let id = self.next_room_id;

        self.rooms.insert(
            id,
            Room {
                id,
                name: room.name,
                capacity: room.capacity,
                location: room.location,
                radius_meters,
            },
        );

        self.next_room_id += 1;
        Ok(id)
    }

    fn _attended(&self, schedule_id: u32, attendee_id: u32) -> bool {
        self.attendances
            .values()
            .any(|a| a.schedule_id == schedule_id && a.attendee_id == attendee_id)
    }

    fn _attendance_insert(&mut self, attendance: Attendance) -> u32 {
        let id = attendance.id;

        log::info!(
            "attendance of {} recorded for schedule {} ({:?})",
            attendance.attendee_id,
            attendance.schedule_id,
            attendance.method
        );

        self.attendances.insert(id, attendance);
        self.next_attendance_id += 1;
        id
    }

    /// Re-derives the seminar status after one of its approvals changed
    fn _aggregate(&mut self, seminar_id: u32, now: DateTime<Utc>) -> Result<SeminarStatus, DbError> {
        let approvals: Vec<&Approval> = self
            .approvals
            .values()
            .filter(|a| a.seminar_id == seminar_id)
            .collect();

        let seminar = self
            .seminars
            .get_mut(&seminar_id)
            .ok_or(DbError::NotFound("seminar"))?;

        let previous = seminar.status;
        let status = apply_lifecycle(seminar, &approvals, now)?;

        if previous != status {
            log::info!(
                "seminar {} is now {} (was {})",
                seminar_id,
                status.as_str(),
                previous.as_str()
            );
        }

        Ok(status)
    }
}

fn _search<'a, T, F>(
    collection: impl Iterator<Item = &'a T>,
    property: F,
    page: Option<usize>,
    query: Option<&str>,
    custom_filter: impl Fn(&T) -> bool,
) -> (usize, Vec<&'a T>)
where
    F: Fn(&T) -> String,
{
    let mut filter = contains_query(query, property);
    let mut total = 0;
    let mut skipped = 0;
    let mut results: Vec<&T> = Vec::new();
    let to_skip = page.map_or(0, |page| (page.max(1) - 1) * PAGE_SIZE);

    for row in collection {
        if !filter(&row) || !custom_filter(row) {
            continue;
        }

        total += 1;

        if skipped < to_skip {
            skipped += 1;
        } else if page.is_none() || results.len() < PAGE_SIZE {
            results.push(row);
        }
    }

    (total, results)
}

/// Returns a function to be used as a filter that checks if the provided query is contained in the
/// object string.
fn contains_query<T, F>(query: Option<&str>, property: F) -> impl FnMut(&&T) -> bool
where
    F: Fn(&T) -> String,
{
    let normalize = |s: &str| unidecode::unidecode(s.trim()).to_ascii_lowercase();
    let query = query.map(|d| truncate(d, 50)).map(normalize);

    move |object: &&T| {
        if let Some(query) = &query {
            let name = property(object);
            let name = normalize(&name);
            name.contains(query)
        } else {
            true
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((idx, _)) => &s[..idx],
    }
}

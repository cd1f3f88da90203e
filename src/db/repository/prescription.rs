use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{date_at, fmt_date, opt_date_at};
use crate::db::DatabaseError;
use crate::models::*;

const PRESCRIPTION_COLUMNS: &str = "id, diagnosis_id, patient_id, employee_id, medication, \
     dosage, instructions, issued_at, valid_until";

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        diagnosis_id: row.get(1)?,
        patient_id: row.get(2)?,
        employee_id: row.get(3)?,
        medication: row.get(4)?,
        dosage: row.get(5)?,
        instructions: row.get(6)?,
        issued_at: date_at(row, 7)?,
        valid_until: opt_date_at(row, 8)?,
    })
}

/// Insert a prescription for the patient of `diagnosis`, issued by `employee_id`.
pub fn insert_prescription(
    conn: &Connection,
    p: &NewPrescription,
    diagnosis: &Diagnosis,
    employee_id: i64,
) -> Result<Prescription, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions
            (diagnosis_id, patient_id, employee_id, medication, dosage, instructions, issued_at, valid_until)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            diagnosis.id,
            diagnosis.patient_id,
            employee_id,
            p.medication,
            p.dosage,
            p.instructions,
            fmt_date(&p.issued_at),
            p.valid_until.map(|d| fmt_date(&d)),
        ],
    )?;
    Ok(Prescription {
        id: conn.last_insert_rowid(),
        diagnosis_id: diagnosis.id,
        patient_id: diagnosis.patient_id,
        employee_id,
        medication: p.medication.clone(),
        dosage: p.dosage.clone(),
        instructions: p.instructions.clone(),
        issued_at: p.issued_at,
        valid_until: p.valid_until,
    })
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
            params![id],
            prescription_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_prescriptions_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         WHERE patient_id = ?1 ORDER BY issued_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id], prescription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_prescriptions_for_diagnosis(
    conn: &Connection,
    diagnosis_id: i64,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         WHERE diagnosis_id = ?1 ORDER BY issued_at, id"
    ))?;
    let rows = stmt
        .query_map(params![diagnosis_id], prescription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rewrite the medication fields. The owning diagnosis and patient do not change.
pub fn update_prescription(
    conn: &Connection,
    id: i64,
    p: &NewPrescription,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE prescriptions
         SET medication = ?1, dosage = ?2, instructions = ?3, issued_at = ?4, valid_until = ?5
         WHERE id = ?6",
        params![
            p.medication,
            p.dosage,
            p.instructions,
            fmt_date(&p.issued_at),
            p.valid_until.map(|d| fmt_date(&d)),
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Prescription", id));
    }
    Ok(())
}

pub fn delete_prescription(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Prescription", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::db::repository::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Gender;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 10)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    fn appointment(conn: &Connection) -> Appointment {
        let doctor = insert_employee(
            conn,
            &NewEmployee {
                first_name: "Greg".into(),
                last_name: "House".into(),
                email: "house@clinic.test".into(),
                phone: None,
                hire_date: NaiveDate::from_ymd_opt(2004, 11, 16).unwrap(),
                role_id: 2,
            },
        )
        .unwrap();
        let patient = insert_patient(
            conn,
            &NewPatient {
                first_name: "Rebecca".into(),
                last_name: "Adler".into(),
                birth_date: NaiveDate::from_ymd_opt(1975, 4, 4).unwrap(),
                gender: Gender::Female,
                national_id: "75040400000".into(),
                phone: None,
                email: None,
                address: None,
            },
            ts(),
        )
        .unwrap();
        insert_appointment(
            conn,
            &NewAppointment {
                patient_id: patient.id,
                employee_id: doctor.id,
                service_id: None,
                room_id: None,
                scheduled_at: ts(),
                duration_minutes: 45,
                notes: None,
            },
        )
        .unwrap()
    }

    fn amoxicillin(diagnosis_id: i64) -> NewPrescription {
        NewPrescription {
            diagnosis_id,
            medication: "Amoxicillin".into(),
            dosage: "500 mg".into(),
            instructions: Some("Three times daily".into()),
            issued_at: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2024, 3, 10),
        }
    }

    #[test]
    fn diagnosis_inherits_patient_and_employee() {
        let conn = open_memory_database().unwrap();
        let appt = appointment(&conn);
        let diag = insert_diagnosis(&conn, &appt, Some("J02.9"), "Acute pharyngitis", ts()).unwrap();
        assert_eq!(diag.patient_id, appt.patient_id);
        assert_eq!(diag.employee_id, appt.employee_id);
        assert_eq!(get_diagnosis(&conn, diag.id).unwrap().unwrap(), diag);
        assert_eq!(list_diagnoses_for_appointment(&conn, appt.id).unwrap().len(), 1);

        update_diagnosis(&conn, diag.id, None, "Viral pharyngitis").unwrap();
        let loaded = list_diagnoses_for_patient(&conn, appt.patient_id).unwrap();
        assert_eq!(loaded[0].description, "Viral pharyngitis");
        assert!(loaded[0].icd_code.is_none());
    }

    #[test]
    fn prescription_round_trip_and_update() {
        let conn = open_memory_database().unwrap();
        let appt = appointment(&conn);
        let diag = insert_diagnosis(&conn, &appt, None, "Infection", ts()).unwrap();
        let rx = insert_prescription(&conn, &amoxicillin(diag.id), &diag, appt.employee_id).unwrap();
        assert_eq!(get_prescription(&conn, rx.id).unwrap().unwrap(), rx);

        let mut changed = amoxicillin(diag.id);
        changed.dosage = "875 mg".into();
        changed.valid_until = None;
        update_prescription(&conn, rx.id, &changed).unwrap();
        let loaded = list_prescriptions_for_patient(&conn, appt.patient_id).unwrap();
        assert_eq!(loaded[0].dosage, "875 mg");
        assert!(loaded[0].valid_until.is_none());
        assert_eq!(list_prescriptions_for_diagnosis(&conn, diag.id).unwrap().len(), 1);

        delete_prescription(&conn, rx.id).unwrap();
        delete_diagnosis(&conn, diag.id).unwrap();
        assert!(get_diagnosis(&conn, diag.id).unwrap().is_none());
    }

    #[test]
    fn diagnosis_with_prescription_cannot_be_deleted_by_schema() {
        let conn = open_memory_database().unwrap();
        let appt = appointment(&conn);
        let diag = insert_diagnosis(&conn, &appt, None, "Infection", ts()).unwrap();
        insert_prescription(&conn, &amoxicillin(diag.id), &diag, appt.employee_id).unwrap();
        assert!(delete_diagnosis(&conn, diag.id).is_err());
    }
}

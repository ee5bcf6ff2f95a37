// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! `TIME` literal semantics and `TIME` columns written through the connector.

use iceberg_hive::ErrorKind;
use iceberg_hive::spec::{
    DayTimeInterval, Datum, PrimitiveType, TimeOfDay, between_nullable, indeterminate,
};
use iceberg_hive_integration_tests::{FILE_FORMATS, set_test_fixture};
use pretty_assertions::assert_eq;

fn time(text: &str) -> TimeOfDay {
    TimeOfDay::parse(text).unwrap()
}

#[test]
fn test_subtract() {
    let diff = time("14:15:16.432") - time("03:04:05.321");
    assert_eq!(diff, DayTimeInterval::new(0, 11, 11, 11, 111).unwrap());
    assert_eq!(
        (diff.days(), diff.hours(), diff.minutes(), diff.seconds(), diff.millis()),
        (0, 11, 11, 11, 111)
    );

    let reverse = time("03:04:05.321") - time("14:15:16.432");
    assert_eq!(
        (
            reverse.days(),
            reverse.hours(),
            reverse.minutes(),
            reverse.seconds(),
            reverse.millis()
        ),
        (0, -11, -11, -11, -111)
    );
    assert_eq!(reverse, -diff);
}

#[test]
fn test_cast() {
    let text = Datum::time_from_str("03:04")
        .unwrap()
        .coerce_to(PrimitiveType::String)
        .unwrap();
    assert_eq!(text, Datum::from("03:04:00"));

    let parsed = Datum::from("03:04:05.321")
        .coerce_to(PrimitiveType::Time)
        .unwrap();
    assert_eq!(parsed, Datum::time_from_str("03:04:05.321").unwrap());

    let err = Datum::from("3 o'clock")
        .coerce_to(PrimitiveType::Time)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedLiteral);
}

#[test]
fn test_between() {
    let value = time("03:04:05.321");
    assert!(value.between(&time("03:04:05.111"), &time("03:04:05.333")));
    // Inverted endpoints are not swapped.
    assert!(!value.between(&time("03:04:05.333"), &time("03:04:05.111")));
    assert_eq!(
        between_nullable(Some(&value), None, Some(&time("03:04:05.333"))),
        None
    );
    assert!(indeterminate(None));
    assert!(!indeterminate(Some(&value)));
}

#[tokio::test]
async fn test_time_column_round_trip() {
    for format in FILE_FORMATS {
        let fixture = set_test_fixture("test_time_column_round_trip", format).await;
        let table = "test_time";
        fixture
            .connector
            .create_table(
                &fixture.schema,
                table,
                [("id", PrimitiveType::Int), ("t", PrimitiveType::Time)],
                None,
            )
            .await
            .unwrap();
        fixture
            .connector
            .insert(&fixture.schema, table, vec![
                vec![Some(Datum::from(1)), Some(Datum::from("03:04:05.321"))],
                vec![Some(Datum::from(2)), Some(Datum::from("23:59:59.999"))],
                vec![Some(Datum::from(3)), None],
            ])
            .await
            .unwrap();

        let mut rows = fixture
            .connector
            .select(&fixture.schema, table)
            .await
            .unwrap()
            .into_rows();
        rows.sort_by_key(|row| row[0].as_ref().and_then(Datum::as_i64));
        assert_eq!(rows, vec![
            vec![
                Some(Datum::from(1)),
                Some(Datum::time(time("03:04:05.321")))
            ],
            vec![
                Some(Datum::from(2)),
                Some(Datum::time(time("23:59:59.999")))
            ],
            vec![Some(Datum::from(3)), None],
        ]);
    }
}

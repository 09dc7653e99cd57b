/*!

This is the long-form manual for `apportionment` and `seatcalc`.

## Methods

Both supported methods are highest-averages methods: the seats are given one at
a time to the list with the highest quotient `votes / divisor`, where the divisor
depends on the number of seats the list already holds.

| method        | divisors         |
|---------------|------------------|
| D'Hondt       | 1, 2, 3, 4, ...  |
| Sainte-Laguë  | 1, 3, 5, 7, ...  |

Quotients are compared exactly. When two lists have the same quotient, the seat goes
to the list whose name comes first in lexicographic order.

For D'Hondt, every allocation also reports the margin of the last seat:

```text
TD won last seat over KO by 4741 votes
```

The runner-up is the list that would have received the next seat (another list than the
winner). The margin is `floor(winner_votes - runner_up_votes * winner_seats / (runner_up_seats + 1))`.

## Thresholds

The statutory threshold is evaluated on the nationwide totals:
* 5% of the valid votes for ordinary lists
* 8% for coalitions
* no threshold for national minorities

A share exactly equal to the threshold is enough.

## Strategies

The strategy is selected by name with the `--apportionment` flag (or `rules.apportionment`
in the configuration):

| name                                        | scope          | method       | threshold |
|---------------------------------------------|----------------|--------------|-----------|
| `constituencial-dhondt`                     | each district  | D'Hondt      | yes       |
| `constituencial-dhondt-no-threshold`        | each district  | D'Hondt      | no        |
| `global-dhondt`                             | nationwide     | D'Hondt      | yes       |
| `global-dhondt-no-threshold`                | nationwide     | D'Hondt      | no        |
| `squared-dhondt`                            | nationwide     | D'Hondt      | yes       |
| `constituencial-sainte-lague`               | each district  | Sainte-Laguë | yes       |
| `constituencial-sainte-lague-no-threshold`  | each district  | Sainte-Laguë | no        |
| `global-sainte-lague`                       | nationwide     | Sainte-Laguë | yes       |
| `global-sainte-lague-no-threshold`          | nationwide     | Sainte-Laguë | no        |
| `fair-vote-weight-dhondt`                   | each district  | D'Hondt      | yes       |

`squared-dhondt` replaces the votes of every list by `votes * (1 + votes / total)` before
running D'Hondt, which gives a bonus to the largest lists.

`fair-vote-weight-dhondt` produces the same seats as `constituencial-dhondt`. Its additional
information compares, for every district, the number of seats with the true proportion
`district_votes * seats / votes` and reports the districts where a vote weighs the most and
the least. The districts are then reseated by rounding `true_proportion + p`, where `p` is
found by bisection so that the total number of seats is preserved, and the comparison is
made again. The reseating is only reported, it does not change the seats of the lists.
The bisection is capped (`rules.roundingMaxIterations`, 200 by default) and fails if no
offset lands exactly on the number of seats.

The comparison tables list the districts only, sorted by increasing voter strength.
The nationwide row is left out of them: its strength is always 0, and it still takes
part in the search of `p`. Districts without any valid vote are left out as well.

## Input formats

Two tables are needed, either as CSV files (`;` separated by default) or as Excel (.xlsx)
worksheets:

* the districts: one row per district with its identifier, its name, its number of seats
  and its number of valid votes.
* the results: one row per district with the votes of every list. The list columns are
  the columns whose name contains a marker (`KOMITET` by default), starting from a given
  column (1-based). If no identifier column is given, the rows are numbered from 1 in
  the order of the file.

Empty cells are read as zero. Districts that only appear in one of the two tables are
kept, with zeros for the missing values (a warning is printed).

## Configuration

`seatcalc` comes with defaults that follow the files published for the elections to the
Polish Sejm. A configuration file in JSON can override them:

```json
{
  "outputSettings": { "contestName": "Sejm 2023", "outputDirectory": "out" },
  "districtSource": {
    "provider": "csv",
    "filePath": "okregi_sejm_utf8.csv",
    "idColumn": "Numer okręgu",
    "nameColumn": "Siedziba OKW",
    "seatsColumn": "Liczba mandatów",
    "validVotesColumn": "Liczba głosów ważnych oddanych łącznie na wszystkie listy kandydatów"
  },
  "resultsSource": {
    "provider": "csv",
    "filePath": "wyniki_gl_na_listy_po_okregach_sejm_utf8.csv",
    "firstListColumnIndex": 26,
    "listColumnMarker": "KOMITET"
  },
  "categoryMarkers": { "coalition": "KOALICYJNY", "minority": "MNIEJSZOŚĆ" },
  "lists": [ { "name": "KOMITET WYBORCZY X", "category": "minority" } ],
  "rules": { "apportionment": "constituencial-dhondt", "roundingMaxIterations": 200 }
}
```

The category of a list is taken from `lists` when it is listed there, otherwise from the
markers, once, when the files are read.

## Outputs

For a strategy `name`, two files are written in the output directory:
* `name-seats.csv` with the columns `party` and `seats`
* `name-additional-info.json` with the diagnostics of the strategy

 */
